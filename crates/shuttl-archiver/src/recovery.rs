//! Recovery of buckets left behind in staging.
//!
//! A staged bucket without a receipt means an earlier transfer failed or
//! the process died mid-way. A staged bucket with a receipt was archived
//! but not cleaned up. Either way the next pass finishes the job.

use std::sync::Arc;

use serde::Serialize;
use shuttl_core::Result;
use shuttl_core::bucket::BucketKey;

use crate::TRACING_TARGET_RECOVERY;
use crate::locker::BucketLocker;
use crate::mover::IndexPreservingBucketMover;
use crate::receipts::CopyReceipts;
use crate::transfer::{BucketTransferer, TransferMode};

/// Counts of one recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Staged buckets transferred into the archive.
    pub recovered: usize,
    /// Staged buckets that already had a receipt and were removed.
    pub cleaned: usize,
    /// Buckets locked by someone else or gone before they were handled.
    pub skipped: usize,
    /// Buckets whose recovery failed; they stay staged.
    pub failed: usize,
}

impl RecoveryReport {
    /// Returns true if the pass found nothing to do.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

enum Recovered {
    Transferred,
    Cleaned,
    Vanished,
}

/// Archives every bucket left in staging.
#[derive(Debug, Clone)]
pub struct FailedBucketsArchiver {
    locker: BucketLocker,
    mover: IndexPreservingBucketMover,
    receipts: CopyReceipts,
    transferer: Arc<BucketTransferer>,
}

impl FailedBucketsArchiver {
    pub fn new(
        locker: BucketLocker,
        mover: IndexPreservingBucketMover,
        receipts: CopyReceipts,
        transferer: Arc<BucketTransferer>,
    ) -> Self {
        Self {
            locker,
            mover,
            receipts,
            transferer,
        }
    }

    /// Handles every staged bucket under its lock.
    ///
    /// Buckets locked elsewhere are skipped, and a failing bucket does not
    /// stop the others. Only failing to scan the staging area is an error.
    pub async fn archive_failed_buckets(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for key in self.mover.staged_bucket_keys().await? {
            let result = self
                .locker
                .call_under_lock(&key, || self.recover_bucket(&key))
                .await;

            match result {
                Ok(Recovered::Transferred) => report.recovered += 1,
                Ok(Recovered::Cleaned) => report.cleaned += 1,
                Ok(Recovered::Vanished) => report.skipped += 1,
                Err(err) if err.is_lock_unavailable() => {
                    tracing::debug!(
                        target: TRACING_TARGET_RECOVERY,
                        index = %key.index(),
                        bucket = %key.name(),
                        "Staged bucket is locked, skipping"
                    );
                    report.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET_RECOVERY,
                        operation = "recover staged bucket",
                        expected = "bucket archived and removed from staging",
                        index = %key.index(),
                        bucket = %key.name(),
                        error = %err,
                        kind = err.kind_str(),
                        "Bucket recovery failed"
                    );
                    report.failed += 1;
                }
            }
        }

        if !report.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_RECOVERY,
                recovered = report.recovered,
                cleaned = report.cleaned,
                skipped = report.skipped,
                failed = report.failed,
                "Recovery pass finished"
            );
        }
        Ok(report)
    }

    async fn recover_bucket(&self, key: &BucketKey) -> Result<Recovered> {
        // Another holder may have finished the bucket before we got the lock.
        let Some(bucket) = self.mover.staged_bucket(key).await? else {
            return Ok(Recovered::Vanished);
        };

        if self.receipts.has_receipt(key).await? {
            self.mover.remove_staged(key).await?;
            tracing::info!(
                target: TRACING_TARGET_RECOVERY,
                index = %key.index(),
                bucket = %key.name(),
                "Removed already archived bucket from staging"
            );
            return Ok(Recovered::Cleaned);
        }

        self.transferer.archive(&bucket, TransferMode::Recovery).await?;
        Ok(Recovered::Transferred)
    }
}

#[cfg(test)]
mod tests {
    use shuttl_core::ArchiveConfig;
    use shuttl_core::bucket::BucketFormat;
    use shuttl_opendal::{ArchiveFileSystem, FsConfig, OpendalArchive, StorageConfig};
    use tempfile::TempDir;

    use super::*;
    use crate::locker::{LockProvider, MemoryLockProvider};
    use crate::paths::PathResolver;

    struct Fixture {
        _local: TempDir,
        remote: TempDir,
        config: Arc<ArchiveConfig>,
        locks: Arc<MemoryLockProvider>,
        recovery: FailedBucketsArchiver,
    }

    impl Fixture {
        fn new() -> Self {
            let local = TempDir::new().unwrap();
            let remote = TempDir::new().unwrap();
            let config = Arc::new(
                ArchiveConfig::new(local.path(), "cluster", "server")
                    .with_archive_formats([BucketFormat::SplunkBucket, BucketFormat::Tgz]),
            );
            let archive: Arc<dyn ArchiveFileSystem> = Arc::new(
                OpendalArchive::new(StorageConfig::Fs(FsConfig::new(remote.path()))).unwrap(),
            );
            let transferer =
                BucketTransferer::new(config.clone(), archive, PathResolver::new()).unwrap();

            let locks = Arc::new(MemoryLockProvider::new());
            let recovery = FailedBucketsArchiver::new(
                BucketLocker::new(locks.clone()),
                IndexPreservingBucketMover::from_config(&config),
                CopyReceipts::from_config(&config),
                Arc::new(transferer),
            );

            Self {
                _local: local,
                remote,
                config,
                locks,
                recovery,
            }
        }

        fn stage(&self, index: &str, name: &str) -> BucketKey {
            let path = self.config.staging_dir().join(index).join(name);
            std::fs::create_dir_all(&path).unwrap();
            std::fs::write(path.join("rawdata"), b"data").unwrap();
            BucketKey::new(index, name).unwrap()
        }
    }

    #[tokio::test]
    async fn test_nothing_staged() {
        let fx = Fixture::new();
        let report = fx.recovery.archive_failed_buckets().await.unwrap();
        assert!(report.is_empty());
        assert!(!fx.config.staging_dir().exists());
    }

    #[tokio::test]
    async fn test_recovers_and_cleans() {
        let fx = Fixture::new();
        let pending = fx.stage("main", "db_2_1_0");
        let done = fx.stage("main", "db_4_3_1");
        let receipts = CopyReceipts::from_config(&fx.config);
        receipts.create_receipt(&done).await.unwrap();

        let report = fx.recovery.archive_failed_buckets().await.unwrap();
        assert_eq!(report.recovered, 1);
        assert_eq!(report.cleaned, 1);
        assert_eq!(report.failed, 0);

        let mover = IndexPreservingBucketMover::from_config(&fx.config);
        assert!(mover.staged_bucket_keys().await.unwrap().is_empty());
        assert!(receipts.has_receipt(&pending).await.unwrap());
        assert!(fx.remote.path().join("TGZ/main/db_2_1_0/db_2_1_0.tgz").exists());
        assert!(!fx.remote.path().join("TGZ/main/db_4_3_1").exists());

        let report = fx.recovery.archive_failed_buckets().await.unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_locked_buckets_are_skipped() {
        let fx = Fixture::new();
        let locked = fx.stage("main", "db_2_1_0");
        fx.stage("main", "db_4_3_1");

        let guard = fx.locks.try_acquire(&locked).await.unwrap();
        let report = fx.recovery.archive_failed_buckets().await.unwrap();
        assert_eq!(report.recovered, 1);
        assert_eq!(report.skipped, 1);
        assert!(fx.config.staging_dir().join("main/db_2_1_0").exists());
        guard.release().await.unwrap();

        let report = fx.recovery.archive_failed_buckets().await.unwrap();
        assert_eq!(report.recovered, 1);
    }
}
