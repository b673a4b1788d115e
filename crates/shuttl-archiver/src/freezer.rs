//! Freezing a bucket into the archive.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use shuttl_core::Result;
use shuttl_core::bucket::LocalBucket;
use strum::AsRefStr;

use crate::TRACING_TARGET_FREEZE;
use crate::locker::BucketLocker;
use crate::mover::IndexPreservingBucketMover;
use crate::receipts::CopyReceipts;
use crate::recovery::FailedBucketsArchiver;
use crate::transfer::{BucketTransferer, TransferMode};

/// What became of a frozen bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FreezeOutcome {
    /// Copied into the archive in every format.
    Archived,
    /// Moved to staging, but the transfer failed. A later recovery pass
    /// archives it.
    Staged,
}

/// Moves buckets out of the hot path and archives them.
#[derive(Debug, Clone)]
pub struct BucketFreezer {
    locker: BucketLocker,
    mover: IndexPreservingBucketMover,
    receipts: CopyReceipts,
    transferer: Arc<BucketTransferer>,
    recovery: FailedBucketsArchiver,
}

impl BucketFreezer {
    pub fn new(
        locker: BucketLocker,
        mover: IndexPreservingBucketMover,
        receipts: CopyReceipts,
        transferer: Arc<BucketTransferer>,
        recovery: FailedBucketsArchiver,
    ) -> Self {
        Self {
            locker,
            mover,
            receipts,
            transferer,
            recovery,
        }
    }

    /// Freezes the bucket directory at `path` belonging to `index`.
    ///
    /// The bucket is moved to staging under its lock and then transferred.
    /// Once staged the bucket is never lost: a failed transfer still returns
    /// [`FreezeOutcome::Staged`]. Afterwards every bucket left in staging is
    /// retried, whatever became of this one.
    ///
    /// Fails without touching `path` if it is not a bucket directory, and
    /// with `LockUnavailable` if the bucket is being handled elsewhere.
    pub async fn freeze_bucket(&self, index: &str, path: &Path) -> Result<FreezeOutcome> {
        let outcome = self.freeze(index, path).await;

        if let Err(err) = self.recovery.archive_failed_buckets().await {
            tracing::warn!(
                target: TRACING_TARGET_FREEZE,
                operation = "recover staged buckets",
                expected = "staging area scanned",
                error = %err,
                "Recovery pass failed"
            );
        }

        outcome
    }

    async fn freeze(&self, index: &str, path: &Path) -> Result<FreezeOutcome> {
        let bucket = LocalBucket::open(index, path).await.inspect_err(|err| {
            tracing::error!(
                target: TRACING_TARGET_FREEZE,
                operation = "open bucket",
                expected = "existing bucket directory",
                index = %index,
                path = %path.display(),
                error = %err,
                kind = err.kind_str(),
                "Cannot freeze bucket"
            );
        })?;

        tracing::info!(
            target: TRACING_TARGET_FREEZE,
            index = %bucket.index(),
            bucket = %bucket.name(),
            path = %bucket.path().display(),
            size = bucket.size(),
            "Freezing bucket"
        );

        self.locker
            .call_under_lock(bucket.key(), || self.freeze_locked(&bucket))
            .await
            .inspect_err(|err| {
                tracing::error!(
                    target: TRACING_TARGET_FREEZE,
                    operation = "freeze bucket",
                    expected = "bucket moved to staging",
                    index = %bucket.index(),
                    bucket = %bucket.name(),
                    path = %bucket.path().display(),
                    error = %err,
                    kind = err.kind_str(),
                    "Bucket not frozen"
                );
            })
    }

    async fn freeze_locked(&self, bucket: &LocalBucket) -> Result<FreezeOutcome> {
        // A receipt left from an earlier bucket with the same identity would
        // make recovery delete the new bucket without archiving it.
        self.receipts.remove_receipt(bucket.key()).await?;

        let staged = self.mover.move_to_staging(bucket).await?;

        match self.transferer.archive(&staged, TransferMode::Fresh).await {
            Ok(()) => Ok(FreezeOutcome::Archived),
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_FREEZE,
                    index = %staged.index(),
                    bucket = %staged.name(),
                    path = %staged.path().display(),
                    error = %err,
                    "Transfer failed, bucket left in staging for recovery"
                );
                Ok(FreezeOutcome::Staged)
            }
        }
    }
}
