//! Bucket locks shared through the file system.
//!
//! Each held lock is a lease file `<lock_dir>/<index>/<bucket>.lock`
//! holding a JSON lease record. Leases are written to a temporary file
//! and published with a hard link, which fails if the lease already
//! exists, so a lease is never observed half-written and never replaced by
//! a competing holder. Holders renew their lease every third of the lease
//! duration; a lease that was not renewed in time belongs to a crashed
//! holder and may be broken. A holder never renews a lapsed lease, and its
//! guard reports the loss when released.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use shuttl_core::bucket::BucketKey;
use shuttl_core::{ArchiveConfig, Error, Result};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{LockGuard, LockProvider};
use crate::TRACING_TARGET_LOCK;

const LEASE_EXTENSION: &str = "lock";
const MIN_RENEW_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LeaseRecord {
    holder: String,
    pid: u32,
    token: Uuid,
    acquired_at: Timestamp,
    expires_at: Timestamp,
}

impl LeaseRecord {
    fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

fn expiry(from: Timestamp, lease: Duration) -> Result<Timestamp> {
    let lease =
        SignedDuration::try_from(lease).map_err(|e| Error::configuration().with_source(e))?;
    from.checked_add(lease)
        .map_err(|e| Error::configuration().with_source(e))
}

/// A file next to `path` with a unique name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.{suffix}", Uuid::new_v4()))
}

async fn write_record(path: &Path, record: &LeaseRecord) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let bytes = serde_json::to_vec(record)?;
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    Ok(())
}

async fn read_record(path: &Path) -> Result<Option<LeaseRecord>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Publishes `record` at `path` unless a lease is already there.
async fn publish(path: &Path, record: &LeaseRecord) -> io::Result<()> {
    let temp = sibling(path, "tmp");
    write_record(&temp, record)
        .await
        .map_err(|err| io::Error::other(err.to_string()))?;

    let linked = tokio::fs::hard_link(&temp, path).await;
    if let Err(err) = tokio::fs::remove_file(&temp).await {
        tracing::debug!(
            target: TRACING_TARGET_LOCK,
            path = %temp.display(),
            error = %err,
            "Failed to remove temporary lease"
        );
    }
    linked
}

/// What a heartbeat found when it tried to extend a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Renewal {
    Renewed,
    /// Another holder published its own lease.
    TakenOver,
    /// The lease ran out before it could be extended and may have been
    /// broken by now.
    Lapsed,
}

/// Extends the lease at `path` if it is still ours and still live.
///
/// A lapsed lease is never rewritten: once `expires_at` has passed, another
/// process may have broken it and published its own lease at `path`.
async fn renew(path: &Path, record: &mut LeaseRecord, lease: Duration) -> Result<Renewal> {
    if record.is_expired(Timestamp::now()) {
        return Ok(Renewal::Lapsed);
    }

    match read_record(path).await? {
        Some(current) if current.token == record.token => {}
        _ => return Ok(Renewal::TakenOver),
    }

    let renewed = LeaseRecord {
        expires_at: expiry(Timestamp::now(), lease)?,
        ..record.clone()
    };
    let temp = sibling(path, "tmp");
    write_record(&temp, &renewed).await?;

    // The replacing rename below is only safe while nobody may break the lease.
    if record.is_expired(Timestamp::now()) {
        let _ = tokio::fs::remove_file(&temp).await;
        return Ok(Renewal::Lapsed);
    }

    tokio::fs::rename(&temp, path).await?;
    *record = renewed;
    Ok(Renewal::Renewed)
}

fn spawn_heartbeat(
    key: BucketKey,
    path: PathBuf,
    mut record: LeaseRecord,
    lease: Duration,
    lost: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let period = (lease / 3).max(MIN_RENEW_PERIOD);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            match renew(&path, &mut record, lease).await {
                Ok(Renewal::Renewed) => {}
                Ok(renewal) => {
                    lost.store(true, Ordering::SeqCst);
                    tracing::warn!(
                        target: TRACING_TARGET_LOCK,
                        index = %key.index(),
                        bucket = %key.name(),
                        path = %path.display(),
                        taken_over = renewal == Renewal::TakenOver,
                        "Bucket lease lost while held"
                    );
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET_LOCK,
                        operation = "renew bucket lease",
                        expected = "lease file rewritten",
                        index = %key.index(),
                        bucket = %key.name(),
                        path = %path.display(),
                        error = %err,
                        "Failed to renew bucket lease"
                    );
                }
            }
        }
    })
}

/// Bucket locks stored as lease files in a directory shared by all
/// archiving processes.
#[derive(Debug, Clone)]
pub struct FileLeaseProvider {
    lock_dir: PathBuf,
    lease: Duration,
    holder: String,
}

impl FileLeaseProvider {
    pub fn new(lock_dir: impl Into<PathBuf>, lease: Duration, holder: impl Into<String>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            lease,
            holder: holder.into(),
        }
    }

    /// Provider for the lock directory and lease of `config`, holding
    /// leases as `<cluster>/<server>`.
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(
            config.lock_dir(),
            config.lock_lease(),
            format!("{}/{}", config.cluster_name, config.server_name),
        )
    }

    /// Location of the lease file for `key`.
    pub fn lease_path(&self, key: &BucketKey) -> PathBuf {
        self.lock_dir
            .join(key.index())
            .join(format!("{}.{LEASE_EXTENSION}", key.name()))
    }

    fn unavailable(key: &BucketKey, holder: &str) -> Error {
        Error::lock_unavailable().with_message(format!("{key} is locked by {holder}"))
    }

    async fn modified_before_lease(&self, path: &Path) -> Result<bool> {
        let modified = tokio::fs::metadata(path).await?.modified()?;
        let age = modified.elapsed().unwrap_or_default();
        Ok(age > self.lease)
    }

    /// Removes the lease at `path` if its holder stopped renewing it.
    ///
    /// Fails with `LockUnavailable` while the lease is live. The lease is
    /// renamed aside before removal, and put back if what was moved turns
    /// out to be a fresh lease published in the meantime.
    async fn break_if_stale(&self, key: &BucketKey, path: &Path) -> Result<()> {
        let stale_token = match read_record(path).await {
            Ok(None) => return Ok(()),
            Ok(Some(record)) if !record.is_expired(Timestamp::now()) => {
                return Err(Self::unavailable(key, &record.holder));
            }
            Ok(Some(record)) => Some(record.token),
            Err(err) => {
                if !self.modified_before_lease(path).await? {
                    return Err(Error::lock_unavailable()
                        .with_message(format!("{key} has an unreadable lease"))
                        .with_source(err));
                }
                None
            }
        };

        let aside = sibling(path, "stale");
        match tokio::fs::rename(path, &aside).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let moved = read_record(&aside).await.ok().flatten();
        let moved_token = moved.as_ref().map(|record| record.token);

        if moved_token == stale_token {
            tokio::fs::remove_file(&aside).await?;
            tracing::warn!(
                target: TRACING_TARGET_LOCK,
                index = %key.index(),
                bucket = %key.name(),
                stale_holder = moved.as_ref().map(|r| r.holder.as_str()).unwrap_or("unknown"),
                "Broke expired bucket lease"
            );
            return Ok(());
        }

        // Raced with a fresh holder: put its lease back.
        let _ = tokio::fs::hard_link(&aside, path).await;
        tokio::fs::remove_file(&aside).await?;
        let holder = moved.map(|record| record.holder).unwrap_or_default();
        Err(Self::unavailable(key, &holder))
    }
}

#[async_trait]
impl LockProvider for FileLeaseProvider {
    async fn try_acquire(&self, key: &BucketKey) -> Result<Box<dyn LockGuard>> {
        let path = self.lease_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let now = Timestamp::now();
        let record = LeaseRecord {
            holder: self.holder.clone(),
            pid: std::process::id(),
            token: Uuid::new_v4(),
            acquired_at: now,
            expires_at: expiry(now, self.lease)?,
        };

        match publish(&path, &record).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                self.break_if_stale(key, &path).await?;
                publish(&path, &record).await.map_err(|err| {
                    if err.kind() == io::ErrorKind::AlreadyExists {
                        Self::unavailable(key, "another holder")
                    } else {
                        err.into()
                    }
                })?;
            }
            Err(err) => return Err(err.into()),
        }

        tracing::debug!(
            target: TRACING_TARGET_LOCK,
            index = %key.index(),
            bucket = %key.name(),
            token = %record.token,
            expires_at = %record.expires_at,
            "Bucket lease acquired"
        );

        let token = record.token;
        let lost = Arc::new(AtomicBool::new(false));
        let heartbeat =
            spawn_heartbeat(key.clone(), path.clone(), record, self.lease, lost.clone());

        Ok(Box::new(FileLeaseGuard {
            key: key.clone(),
            path,
            token,
            heartbeat,
            lost,
            released: false,
        }))
    }
}

struct FileLeaseGuard {
    key: BucketKey,
    path: PathBuf,
    token: Uuid,
    heartbeat: JoinHandle<()>,
    /// Set by the heartbeat once the lease could no longer be renewed.
    lost: Arc<AtomicBool>,
    released: bool,
}

#[async_trait]
impl LockGuard for FileLeaseGuard {
    fn key(&self) -> &BucketKey {
        &self.key
    }

    async fn release(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.heartbeat.abort();
        this.released = true;

        let lost = this.lost.load(Ordering::SeqCst);
        match read_record(&this.path).await? {
            Some(record) if record.token == this.token => {}
            _ if lost => {
                return Err(Error::lock_unavailable()
                    .with_message(format!("lease on {} lapsed while held", this.key)));
            }
            _ => return Ok(()),
        }

        match tokio::fs::remove_file(&this.path).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl Drop for FileLeaseGuard {
    fn drop(&mut self) {
        self.heartbeat.abort();
        if self.released {
            return;
        }

        let owned = std::fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<LeaseRecord>(&bytes).ok())
            .is_some_and(|record| record.token == self.token);

        if owned {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
