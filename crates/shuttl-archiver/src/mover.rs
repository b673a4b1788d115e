//! Index preserving moves into the staging area.
//!
//! Staged buckets live at `<staging_root>/<index>/<bucket>`. Once a bucket
//! is there it survives a crash of the freezing process, and its index can
//! be recovered from the directory structure alone.

use std::io;
use std::path::PathBuf;

use shuttl_core::bucket::{BucketKey, LocalBucket};
use shuttl_core::{ArchiveConfig, Error, Result, fs};
use uuid::Uuid;

use crate::TRACING_TARGET_FREEZE;

/// Prefix of in-progress cross-device copies inside the staging root.
const INCOMING_PREFIX: &str = ".incoming-";

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Moves buckets into staging, keyed by their index.
#[derive(Debug, Clone)]
pub struct IndexPreservingBucketMover {
    staging_root: PathBuf,
}

impl IndexPreservingBucketMover {
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.staging_dir())
    }

    /// `<staging_root>/<index>/<bucket>`
    pub fn staging_path(&self, key: &BucketKey) -> PathBuf {
        self.staging_root.join(key.index()).join(key.name())
    }

    /// Moves `bucket` into staging, keeping its directory name.
    ///
    /// Fails with `OverwriteDenied` if a bucket with the same identity is
    /// already staged. Across file systems the bucket is copied into a
    /// hidden directory first and renamed into place, so a staged bucket is
    /// always complete.
    pub async fn move_to_staging(&self, bucket: &LocalBucket) -> Result<LocalBucket> {
        let destination = self.staging_path(bucket.key());
        if fs::exists(&destination).await? {
            return Err(Error::overwrite_denied().with_message(format!(
                "bucket {} is already staged at {}",
                bucket.key(),
                destination.display()
            )));
        }

        let index_dir = self.staging_root.join(bucket.index());
        tokio::fs::create_dir_all(&index_dir).await?;

        match tokio::fs::rename(bucket.path(), &destination).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                let incoming = self
                    .staging_root
                    .join(format!("{INCOMING_PREFIX}{}", Uuid::new_v4()));

                if let Err(err) = fs::copy_dir_all(bucket.path(), &incoming).await {
                    let _ = fs::remove_path(&incoming).await;
                    return Err(err.into());
                }
                tokio::fs::rename(&incoming, &destination).await?;
                fs::remove_path(bucket.path()).await?;
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            target: TRACING_TARGET_FREEZE,
            index = %bucket.index(),
            bucket = %bucket.name(),
            from = %bucket.path().display(),
            to = %destination.display(),
            "Bucket moved to staging"
        );

        let staged =
            LocalBucket::from_parts(bucket.key().clone(), destination, bucket.format());
        Ok(match bucket.size() {
            Some(size) => staged.with_size(size),
            None => staged,
        })
    }

    /// Identities of all staged buckets, sorted.
    ///
    /// A missing staging root means nothing is staged; it is not created.
    /// Hidden entries and names that are not valid identities are skipped.
    pub async fn staged_bucket_keys(&self) -> Result<Vec<BucketKey>> {
        let mut keys = Vec::new();
        for index in list_dirs(&self.staging_root).await? {
            for name in list_dirs(&self.staging_root.join(&index)).await? {
                match BucketKey::new(index.as_str(), name.as_str()) {
                    Ok(key) => keys.push(key),
                    Err(err) => tracing::warn!(
                        target: TRACING_TARGET_FREEZE,
                        index = %index,
                        bucket = %name,
                        error = %err,
                        "Skipping staged entry"
                    ),
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Opens the staged bucket for `key`, or `None` if it is not staged.
    pub async fn staged_bucket(&self, key: &BucketKey) -> Result<Option<LocalBucket>> {
        match LocalBucket::open(key.index(), self.staging_path(key)).await {
            Ok(bucket) => Ok(Some(bucket)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Deletes the staged copy of `key`. Missing copies are not an error.
    pub async fn remove_staged(&self, key: &BucketKey) -> Result<()> {
        fs::remove_path(self.staging_path(key)).await?;
        Ok(())
    }
}

/// Names of the visible subdirectories of `dir`; empty if `dir` is missing.
async fn list_dirs(dir: &std::path::Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !is_hidden(&name) {
            names.push(name);
        }
    }
    Ok(names)
}
