//! Copying staged buckets into the archive.

use std::sync::Arc;

use shuttl_core::bucket::{Bucket, LocalBucket};
use shuttl_core::{ArchiveConfig, Result};
use shuttl_opendal::ArchiveFileSystem;
use strum::{AsRefStr, IntoStaticStr};

use crate::TRACING_TARGET_TRANSFER;
use crate::format::BucketFormatChanger;
use crate::metadata::BucketMetadata;
use crate::mover::IndexPreservingBucketMover;
use crate::paths::PathResolver;
use crate::receipts::CopyReceipts;

/// Why a bucket is being transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransferMode {
    /// First attempt for a freshly staged bucket.
    Fresh,
    /// Resuming a bucket left staged by an earlier run. Archived data that
    /// is already present counts as done.
    Recovery,
}

/// Converts a staged bucket into every archive format, copies each one into
/// the archive and records the copy receipt.
pub struct BucketTransferer {
    archive: Arc<dyn ArchiveFileSystem>,
    resolver: PathResolver,
    changers: Vec<BucketFormatChanger>,
    receipts: CopyReceipts,
    mover: IndexPreservingBucketMover,
    config: Arc<ArchiveConfig>,
}

impl BucketTransferer {
    pub fn new(
        config: Arc<ArchiveConfig>,
        archive: Arc<dyn ArchiveFileSystem>,
        resolver: PathResolver,
    ) -> Result<Self> {
        let changers =
            BucketFormatChanger::for_formats(&config.archive_formats, &config.work_dir())?;

        Ok(Self {
            archive,
            resolver,
            changers,
            receipts: CopyReceipts::from_config(&config),
            mover: IndexPreservingBucketMover::from_config(&config),
            config,
        })
    }

    /// Archives `bucket` in every configured format.
    ///
    /// On success the receipt exists and the staged copy is gone. On failure
    /// no receipt is written and the staged copy is left for recovery.
    pub async fn archive(&self, bucket: &LocalBucket, mode: TransferMode) -> Result<()> {
        for changer in &self.changers {
            self.archive_format(bucket, changer, mode).await?;
        }

        self.receipts.create_receipt(bucket.key()).await?;

        if let Err(err) = self.mover.remove_staged(bucket.key()).await {
            tracing::warn!(
                target: TRACING_TARGET_TRANSFER,
                operation = "remove staged bucket",
                expected = "staged copy deleted after receipt",
                index = %bucket.index(),
                bucket = %bucket.name(),
                path = %bucket.path().display(),
                error = %err,
                "Archived bucket left in staging"
            );
        }

        tracing::info!(
            target: TRACING_TARGET_TRANSFER,
            index = %bucket.index(),
            bucket = %bucket.name(),
            mode = mode.as_ref(),
            "Bucket archived"
        );
        Ok(())
    }

    async fn archive_format(
        &self,
        bucket: &LocalBucket,
        changer: &BucketFormatChanger,
        mode: TransferMode,
    ) -> Result<()> {
        let format = changer.target_format();
        let data_path = self.resolver.archived_data_path(format, bucket.key());

        let converted = changer.change_format(bucket).await.inspect_err(|err| {
            tracing::error!(
                target: TRACING_TARGET_TRANSFER,
                operation = "change bucket format",
                expected = "converted local artifact",
                index = %bucket.index(),
                bucket = %bucket.name(),
                format = %format,
                path = %bucket.path().display(),
                error = %err,
                "Format change failed"
            );
        })?;

        let copied = self.archive.put_atomically(converted.path(), &data_path).await;

        if let Err(err) = changer.discard(&converted).await {
            tracing::warn!(
                target: TRACING_TARGET_TRANSFER,
                path = %converted.path().display(),
                error = %err,
                "Failed to remove converted artifact"
            );
        }

        match copied {
            Ok(()) => {}
            Err(err) if err.is_overwrite_denied() && mode == TransferMode::Recovery => {
                tracing::info!(
                    target: TRACING_TARGET_TRANSFER,
                    index = %bucket.index(),
                    bucket = %bucket.name(),
                    format = %format,
                    remote = %data_path,
                    "Bucket already archived in this format"
                );
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_TRANSFER,
                    operation = "put bucket atomically",
                    expected = "archive path vacant and copy complete",
                    mode = mode.as_ref(),
                    index = %bucket.index(),
                    bucket = %bucket.name(),
                    format = %format,
                    local = %converted.path().display(),
                    remote = %data_path,
                    error = %err,
                    "Bucket transfer failed"
                );
                return Err(err);
            }
        }

        self.write_metadata(converted.as_bucket(), bucket).await
    }

    async fn write_metadata(&self, converted: &Bucket, staged: &LocalBucket) -> Result<()> {
        let size = converted.size().or(staged.size());
        let metadata = BucketMetadata::new(&converted.clone().with_size(size), &self.config);
        let path = self.resolver.metadata_path(converted.format(), converted.key());

        match self.archive.put_bytes(metadata.to_bytes()?, &path).await {
            Err(err) if !err.is_overwrite_denied() => {
                tracing::error!(
                    target: TRACING_TARGET_TRANSFER,
                    operation = "write bucket metadata",
                    expected = "metadata stored next to archived data",
                    index = %converted.index(),
                    bucket = %converted.name(),
                    remote = %path,
                    error = %err,
                    "Metadata write failed"
                );
                Err(err)
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for BucketTransferer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketTransferer")
            .field("resolver", &self.resolver)
            .field("changers", &self.changers)
            .finish_non_exhaustive()
    }
}
