//! Thawing archived buckets back onto local disk.

mod location;
mod thawer;

use std::path::PathBuf;

use jiff::Timestamp;
pub use location::ThawLocationProvider;
use serde::Serialize;
use shuttl_core::Result;
pub use thawer::BucketThawer;

use crate::TRACING_TARGET_THAW;
use crate::listing::ListingService;

/// A bucket restored to local disk.
#[derive(Debug, Clone, Serialize)]
pub struct ThawedBucket {
    pub index: String,
    pub name: String,
    pub format: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A bucket that could not be thawed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedThaw {
    /// `<index>/<bucket>`
    pub bucket: String,
    pub reason: String,
}

/// Outcome of thawing a selection of buckets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThawReport {
    pub thawed: Vec<ThawedBucket>,
    pub failed: Vec<FailedThaw>,
}

/// Thaws every bucket matched by a listing.
#[derive(Debug, Clone)]
pub struct ThawService {
    listing: ListingService,
    thawer: BucketThawer,
}

impl ThawService {
    pub fn new(listing: ListingService, thawer: BucketThawer) -> Self {
        Self { listing, thawer }
    }

    /// Thaws the archived buckets of `index` (or of every index) overlapping
    /// `[from, to]`, each in the format the listing picked.
    ///
    /// A failing bucket is reported and does not stop the others.
    pub async fn thaw_buckets(
        &self,
        index: Option<&str>,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<ThawReport> {
        let listing = self.listing.list_buckets(index, from, to).await?;
        let mut report = ThawReport::default();

        for bucket in &listing.buckets {
            match self.thawer.thaw(bucket).await {
                Ok(thawed) => report.thawed.push(ThawedBucket {
                    index: thawed.index().to_owned(),
                    name: thawed.name().to_owned(),
                    format: bucket.format().to_string(),
                    path: thawed.path().to_path_buf(),
                    size: thawed.size(),
                }),
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET_THAW,
                        operation = "thaw bucket",
                        expected = "bucket restored to its thaw location",
                        index = %bucket.index(),
                        bucket = %bucket.name(),
                        format = %bucket.format(),
                        error = %err,
                        "Bucket not thawed"
                    );
                    report.failed.push(FailedThaw {
                        bucket: bucket.key().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shuttl_core::ArchiveConfig;
    use shuttl_core::bucket::{Bucket, BucketFormat, BucketKey, BucketLocation};
    use shuttl_core::path::RemotePath;
    use shuttl_opendal::{ArchiveFileSystem, FsConfig, OpendalArchive, StorageConfig};
    use tempfile::TempDir;

    use super::*;
    use crate::ArchiverState;
    use crate::locker::MemoryLockProvider;

    struct Fixture {
        local: TempDir,
        _remote: TempDir,
        archive: Arc<dyn ArchiveFileSystem>,
        state: ArchiverState,
    }

    impl Fixture {
        fn new(priority: BucketFormat) -> Self {
            let local = TempDir::new().unwrap();
            let remote = TempDir::new().unwrap();
            let config = ArchiveConfig::new(local.path().join("shuttl"), "cluster", "server")
                .with_archive_formats([BucketFormat::SplunkBucket, BucketFormat::Tgz])
                .with_format_priority([priority])
                .with_thaw_dir(local.path().join("thawed"));
            let archive: Arc<dyn ArchiveFileSystem> = Arc::new(
                OpendalArchive::new(StorageConfig::Fs(FsConfig::new(remote.path()))).unwrap(),
            );
            let state = ArchiverState::new(
                config,
                archive.clone(),
                Arc::new(MemoryLockProvider::new()),
            )
            .unwrap();

            Self {
                local,
                _remote: remote,
                archive,
                state,
            }
        }

        async fn freeze(&self, name: &str) {
            let path = self.local.path().join("hot").join(name);
            std::fs::create_dir_all(path.join("rawdata")).unwrap();
            std::fs::write(path.join("rawdata/journal"), name.as_bytes()).unwrap();
            self.state.freezer.freeze_bucket("main", &path).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_thaw_each_format() {
        for format in [BucketFormat::SplunkBucket, BucketFormat::Tgz] {
            let fx = Fixture::new(format);
            fx.freeze("db_200_100_0").await;
            fx.freeze("db_900_800_1").await;

            let at = |s| Timestamp::from_second(s).unwrap();
            let report = fx
                .state
                .thaw
                .thaw_buckets(Some("main"), Some(at(0)), Some(at(300)))
                .await
                .unwrap();

            assert!(report.failed.is_empty());
            assert_eq!(report.thawed.len(), 1);
            assert_eq!(report.thawed[0].format, format.to_string());

            let thawed = fx.local.path().join("thawed/main/db_200_100_0");
            assert_eq!(report.thawed[0].path, thawed);
            assert_eq!(
                std::fs::read(thawed.join("rawdata/journal")).unwrap(),
                b"db_200_100_0"
            );
            assert!(!fx.local.path().join("thawed/main/db_900_800_1").exists());

            let downloads = std::fs::read_dir(fx.state.config.work_dir())
                .unwrap()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_file())
                .count();
            assert_eq!(downloads, 0);
        }
    }

    #[tokio::test]
    async fn test_thaw_failures_are_reported() {
        let fx = Fixture::new(BucketFormat::SplunkBucket);
        fx.freeze("db_200_100_0").await;
        std::fs::create_dir_all(fx.local.path().join("thawed/main/db_200_100_0")).unwrap();

        let report = fx.state.thaw.thaw_buckets(None, None, None).await.unwrap();
        assert!(report.thawed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].bucket, "main/db_200_100_0");
    }

    #[tokio::test]
    async fn test_thaw_rejects_unknown_and_local_buckets() {
        let fx = Fixture::new(BucketFormat::SplunkBucket);
        let thawer = BucketThawer::from_config(&fx.state.config, fx.archive.clone());
        let key = BucketKey::new("main", "db_200_100_0").unwrap();

        let unknown = Bucket::new(
            key.clone(),
            BucketLocation::Remote(RemotePath::new("x")),
            BucketFormat::Unknown,
        );
        let err = thawer.thaw(&unknown).await.unwrap_err();
        assert_eq!(err.kind(), shuttl_core::ErrorKind::InvalidInput);

        let local = Bucket::new(
            key,
            BucketLocation::Local(fx.local.path().to_path_buf()),
            BucketFormat::SplunkBucket,
        );
        let err = thawer.thaw(&local).await.unwrap_err();
        assert_eq!(err.kind(), shuttl_core::ErrorKind::InvalidInput);
    }
}
