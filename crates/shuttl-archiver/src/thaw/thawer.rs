use std::path::{Path, PathBuf};
use std::sync::Arc;

use shuttl_core::bucket::{Bucket, BucketFormat, LocalBucket};
use shuttl_core::path::RemotePath;
use shuttl_core::{ArchiveConfig, Error, Result, fs};
use shuttl_opendal::ArchiveFileSystem;
use uuid::Uuid;

use super::ThawLocationProvider;
use crate::TRACING_TARGET_THAW;
use crate::format::extract_tgz;

/// Restores archived buckets to local disk as raw bucket directories.
#[derive(Clone)]
pub struct BucketThawer {
    archive: Arc<dyn ArchiveFileSystem>,
    locations: ThawLocationProvider,
    work_dir: PathBuf,
}

impl BucketThawer {
    pub fn new(
        archive: Arc<dyn ArchiveFileSystem>,
        locations: ThawLocationProvider,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            archive,
            locations,
            work_dir: work_dir.into(),
        }
    }

    pub fn from_config(config: &ArchiveConfig, archive: Arc<dyn ArchiveFileSystem>) -> Self {
        Self::new(
            archive,
            ThawLocationProvider::from_config(config),
            config.work_dir(),
        )
    }

    /// Copies the archived `bucket` to its thaw location.
    ///
    /// The bucket must be a remote bucket in an archivable format. Fails with
    /// `OverwriteDenied` if the thaw location is taken. Nothing is left at
    /// the thaw location when the copy fails.
    pub async fn thaw(&self, bucket: &Bucket) -> Result<LocalBucket> {
        let remote = bucket.remote_path().ok_or_else(|| {
            Error::invalid_input()
                .with_message(format!("bucket {} is not in the archive", bucket.key()))
        })?;

        let dest = self.locations.location_for(bucket.key());
        if fs::exists(&dest).await? {
            return Err(Error::overwrite_denied().with_message(format!(
                "thaw location {} already exists",
                dest.display()
            )));
        }

        match bucket.format() {
            BucketFormat::SplunkBucket => self.thaw_directory(remote, &dest).await?,
            BucketFormat::Tgz => self.thaw_tgz(remote, &dest).await?,
            BucketFormat::Unknown => {
                return Err(Error::invalid_input().with_message(format!(
                    "bucket {} has no thawable format",
                    bucket.key()
                )));
            }
        }

        tracing::info!(
            target: TRACING_TARGET_THAW,
            index = %bucket.index(),
            bucket = %bucket.name(),
            format = %bucket.format(),
            remote = %remote,
            path = %dest.display(),
            "Bucket thawed"
        );

        LocalBucket::open(bucket.index(), &dest).await
    }

    async fn thaw_directory(&self, remote: &RemotePath, dest: &Path) -> Result<()> {
        let incoming = hidden_sibling(dest, "thaw")?;
        self.archive.get(remote, &incoming).await?;

        if let Err(err) = tokio::fs::rename(&incoming, dest).await {
            let _ = fs::remove_path(&incoming).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn thaw_tgz(&self, remote: &RemotePath, dest: &Path) -> Result<()> {
        let download = self.work_dir.join(format!("thaw-{}.tgz", Uuid::new_v4()));
        self.archive.get(remote, &download).await?;

        let extracted = extract_tgz(&download, dest).await;
        if let Err(err) = fs::remove_path(&download).await {
            tracing::warn!(
                target: TRACING_TARGET_THAW,
                path = %download.display(),
                error = %err,
                "Failed to remove downloaded archive"
            );
        }
        extracted
    }
}

impl std::fmt::Debug for BucketThawer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketThawer")
            .field("locations", &self.locations)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

/// `<parent>/.<name>.<tag>-<uuid>`
fn hidden_sibling(path: &Path, tag: &str) -> Result<PathBuf> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(Error::invalid_input()
            .with_message(format!("{} has no parent directory", path.display())));
    };
    Ok(parent.join(format!(
        ".{}.{tag}-{}",
        name.to_string_lossy(),
        Uuid::new_v4()
    )))
}
