//! Buckets on local disk.

use std::path::{Path, PathBuf};

use derive_more::Deref;

use super::{Bucket, BucketFormat, BucketKey, BucketLocation};
use crate::error::{Error, Result};
use crate::{TRACING_TARGET_BUCKET, fs};

/// A [`Bucket`] known to reside on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct LocalBucket {
    #[deref]
    bucket: Bucket,
    path: PathBuf,
}

impl LocalBucket {
    /// Opens the raw bucket directory at `path` for the given index.
    ///
    /// The bucket name is the last component of `path`. Fails with
    /// `NotFound` if nothing exists at `path`, `NotADirectory` if it is not
    /// a directory and `InvalidInput` if the index or the name is unusable.
    pub async fn open(index: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found()
                    .with_message(format!("bucket directory '{}' does not exist", path.display())));
            }
            Err(err) => return Err(err.into()),
        };

        if !metadata.is_dir() {
            return Err(Error::not_a_directory()
                .with_message(format!("bucket path '{}' is not a directory", path.display())));
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::invalid_input().with_message(format!(
                    "bucket path '{}' has no usable directory name",
                    path.display()
                ))
            })?;

        let key = BucketKey::new(index, name)?;
        let size = fs::directory_size(path).await?;

        tracing::debug!(
            target: TRACING_TARGET_BUCKET,
            index = %key.index(),
            bucket = %key.name(),
            path = %path.display(),
            size,
            "Opened local bucket"
        );

        Ok(Self::from_parts(key, path.to_path_buf(), BucketFormat::SplunkBucket).with_size(size))
    }

    /// Wraps an already known local artifact without touching the disk.
    pub fn from_parts(key: BucketKey, path: PathBuf, format: BucketFormat) -> Self {
        let bucket = Bucket::new(key, BucketLocation::Local(path.clone()), format);
        Self { bucket, path }
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.bucket = self.bucket.with_size(Some(size));
        self
    }

    /// Location of the bucket files.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bucket(&self) -> &Bucket {
        &self.bucket
    }

    pub fn into_bucket(self) -> Bucket {
        self.bucket
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_open_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("db_200_100_0");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("rawdata"), b"12345").unwrap();

        let bucket = LocalBucket::open("main", &dir).await.unwrap();
        assert_eq!(bucket.index(), "main");
        assert_eq!(bucket.name(), "db_200_100_0");
        assert_eq!(bucket.format(), BucketFormat::SplunkBucket);
        assert_eq!(bucket.size(), Some(5));
        assert_eq!(bucket.path(), dir.as_path());
    }

    #[tokio::test]
    async fn test_open_rejects_bad_paths() {
        let temp = TempDir::new().unwrap();

        let err = LocalBucket::open("main", temp.path().join("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let file = temp.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        let err = LocalBucket::open("main", &file).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);

        let err = LocalBucket::open("", temp.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
