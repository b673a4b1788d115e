//! Per-bucket mutual exclusion.
//!
//! Locks are keyed by [`BucketKey`]: the same bucket is never handled by
//! two holders at once, while distinct buckets never block each other.
//! Acquisition never waits; a held lock fails fast with `LockUnavailable`.

mod file_lease;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
pub use file_lease::FileLeaseProvider;
pub use memory::MemoryLockProvider;
use shuttl_core::Result;
use shuttl_core::bucket::BucketKey;

use crate::TRACING_TARGET_LOCK;

/// A held bucket lock.
///
/// Dropping a guard without calling [`release`](LockGuard::release) still
/// gives the lock up on a best-effort basis.
#[async_trait]
pub trait LockGuard: Send + Sync {
    /// Identity the lock is held for.
    fn key(&self) -> &BucketKey;

    /// Gives the lock up.
    async fn release(self: Box<Self>) -> Result<()>;
}

/// A mechanism for acquiring bucket locks.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Acquires the lock for `key` or fails with `LockUnavailable`.
    async fn try_acquire(&self, key: &BucketKey) -> Result<Box<dyn LockGuard>>;
}

/// Runs bucket handlers while holding the bucket's lock.
#[derive(Clone)]
pub struct BucketLocker {
    provider: Arc<dyn LockProvider>,
}

impl BucketLocker {
    pub fn new(provider: Arc<dyn LockProvider>) -> Self {
        Self { provider }
    }

    /// Acquires the lock for `key`, runs `handler` exactly once and releases
    /// the lock whatever the handler returned.
    ///
    /// If the lock is held elsewhere the handler is not run and the call
    /// fails with `LockUnavailable`.
    pub async fn call_under_lock<F, Fut, T>(&self, key: &BucketKey, handler: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = match self.provider.try_acquire(key).await {
            Ok(guard) => guard,
            Err(err) => {
                tracing::debug!(
                    target: TRACING_TARGET_LOCK,
                    index = %key.index(),
                    bucket = %key.name(),
                    error = %err,
                    "Bucket lock not acquired"
                );
                return Err(err);
            }
        };

        tracing::debug!(
            target: TRACING_TARGET_LOCK,
            index = %key.index(),
            bucket = %key.name(),
            "Bucket lock acquired"
        );

        let result = handler().await;

        if let Err(err) = guard.release().await {
            tracing::warn!(
                target: TRACING_TARGET_LOCK,
                operation = "release bucket lock",
                expected = "lock released",
                index = %key.index(),
                bucket = %key.name(),
                error = %err,
                "Failed to release bucket lock"
            );
        }

        result
    }
}

impl std::fmt::Debug for BucketLocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketLocker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use shuttl_core::{Error, ErrorKind};
    use tokio::sync::oneshot;

    use super::*;

    fn locker() -> BucketLocker {
        BucketLocker::new(Arc::new(MemoryLockProvider::new()))
    }

    fn key(name: &str) -> BucketKey {
        BucketKey::new("main", name).unwrap()
    }

    #[tokio::test]
    async fn test_same_bucket_never_overlaps() {
        let locker = locker();
        let (entered_tx, entered_rx) = oneshot::channel();
        let (finish_tx, finish_rx) = oneshot::channel::<()>();

        let holder = {
            let locker = locker.clone();
            tokio::spawn(async move {
                locker
                    .call_under_lock(&key("db_2_1_0"), || async move {
                        entered_tx.send(()).unwrap();
                        finish_rx.await.unwrap();
                        Ok(())
                    })
                    .await
            })
        };
        entered_rx.await.unwrap();

        let calls = AtomicUsize::new(0);
        let err = locker
            .call_under_lock(&key("db_2_1_0"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockUnavailable);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // A different bucket is not blocked.
        locker
            .call_under_lock(&key("db_3_1_1"), || async { Ok(()) })
            .await
            .unwrap();

        finish_tx.send(()).unwrap();
        holder.await.unwrap().unwrap();

        locker
            .call_under_lock(&key("db_2_1_0"), || async { Ok(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_lock_released_when_handler_fails() {
        let locker = locker();
        let err = locker
            .call_under_lock(&key("db_2_1_0"), || async {
                Err::<(), _>(Error::not_found())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let value = locker
            .call_under_lock(&key("db_2_1_0"), || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
