//! In-process bucket locks.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use shuttl_core::bucket::BucketKey;
use shuttl_core::{Error, Result};

use super::{LockGuard, LockProvider};

type HeldKeys = Arc<Mutex<HashSet<BucketKey>>>;

/// Locks that only exclude holders within the current process.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockProvider {
    held: HeldKeys,
}

impl MemoryLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` is currently locked.
    pub fn is_locked(&self, key: &BucketKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

#[async_trait]
impl LockProvider for MemoryLockProvider {
    async fn try_acquire(&self, key: &BucketKey) -> Result<Box<dyn LockGuard>> {
        let inserted = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());

        if !inserted {
            return Err(Error::lock_unavailable().with_message(format!("{key} is locked")));
        }

        Ok(Box::new(MemoryLockGuard {
            key: key.clone(),
            held: self.held.clone(),
        }))
    }
}

struct MemoryLockGuard {
    key: BucketKey,
    held: HeldKeys,
}

#[async_trait]
impl LockGuard for MemoryLockGuard {
    fn key(&self) -> &BucketKey {
        &self.key
    }

    async fn release(self: Box<Self>) -> Result<()> {
        // Drop removes the key.
        Ok(())
    }
}

impl Drop for MemoryLockGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_guard_unlocks() {
        let provider = MemoryLockProvider::new();
        let key = BucketKey::new("main", "db_2_1_0").unwrap();

        let guard = provider.try_acquire(&key).await.unwrap();
        assert_eq!(guard.key(), &key);
        assert!(provider.is_locked(&key));
        assert!(provider.try_acquire(&key).await.is_err());

        drop(guard);
        assert!(!provider.is_locked(&key));
        provider.try_acquire(&key).await.unwrap().release().await.unwrap();
        assert!(!provider.is_locked(&key));
    }
}
