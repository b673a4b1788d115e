use std::sync::Arc;

use jiff::Timestamp;
use serde::Serialize;
use shuttl_core::bucket::{Bucket, BucketFormat};
use shuttl_core::{ArchiveConfig, Result};
use shuttl_opendal::ArchiveFileSystem;

use super::{
    ArchiveBucketsLister, ArchivedIndexesLister, BucketFilter, BucketFormatChooser,
    BucketFormatResolver,
};
use crate::TRACING_TARGET_LISTING;
use crate::paths::PathResolver;

/// 0001-01-01T00:00:00Z
const DEFAULT_FROM_SECOND: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z
const DEFAULT_TO_SECOND: i64 = 253_402_300_799;

/// Lower bound used when a listing has no `from`.
pub fn default_from() -> Timestamp {
    Timestamp::from_second(DEFAULT_FROM_SECOND).unwrap_or(Timestamp::MIN)
}

/// Upper bound used when a listing has no `to`.
pub fn default_to() -> Timestamp {
    Timestamp::from_second(DEFAULT_TO_SECOND).unwrap_or(Timestamp::MAX)
}

/// Result of a bucket listing.
#[derive(Debug, Clone, Serialize)]
pub struct BucketListing {
    /// One entry per bucket identity, in the chosen format.
    pub buckets: Vec<Bucket>,
    /// Sum of the known bucket sizes in bytes.
    pub total_size: u64,
    /// `total_size` for humans, e.g. `2 MB`.
    pub total_size_display: String,
}

impl BucketListing {
    fn new(buckets: Vec<Bucket>) -> Self {
        let total_size = buckets.iter().filter_map(Bucket::size).sum();
        Self {
            buckets,
            total_size,
            total_size_display: display_size(total_size),
        }
    }
}

/// Formats a byte count in whole binary units, rounding down.
pub fn display_size(bytes: u64) -> String {
    const UNITS: [(&str, u32); 6] = [
        ("EB", 60),
        ("PB", 50),
        ("TB", 40),
        ("GB", 30),
        ("MB", 20),
        ("KB", 10),
    ];

    UNITS
        .iter()
        .find(|(_, shift)| bytes >> shift > 0)
        .map(|(unit, shift)| format!("{} {unit}", bytes >> shift))
        .unwrap_or_else(|| format!("{bytes} bytes"))
}

/// Lists archived indexes and buckets.
#[derive(Clone)]
pub struct ListingService {
    indexes: ArchivedIndexesLister,
    buckets: ArchiveBucketsLister,
    resolver: BucketFormatResolver,
    filter: BucketFilter,
}

impl ListingService {
    pub fn new(
        config: &ArchiveConfig,
        archive: Arc<dyn ArchiveFileSystem>,
        paths: PathResolver,
    ) -> Self {
        let chooser = BucketFormatChooser::new(config.format_priority.clone());
        Self {
            indexes: ArchivedIndexesLister::new(archive.clone(), paths.clone()),
            buckets: ArchiveBucketsLister::new(archive, paths),
            resolver: BucketFormatResolver::new(chooser),
            filter: BucketFilter::new(),
        }
    }

    /// Indexes present in the archive, sorted.
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        self.indexes.list_indexes().await
    }

    /// Archived buckets of `index` (or of every index) overlapping
    /// `[from, to]`, one per identity.
    pub async fn list_buckets(
        &self,
        index: Option<&str>,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<BucketListing> {
        let buckets = match index {
            Some(index) => self.buckets.list_buckets_in_index(index).await?,
            None => self.buckets.list_buckets().await?,
        };

        let buckets = self.resolver.resolve_buckets_with_formats(buckets);
        let buckets = self.filter.filter_by_time_range(
            buckets,
            from.unwrap_or_else(default_from),
            to.unwrap_or_else(default_to),
        );

        tracing::debug!(
            target: TRACING_TARGET_LISTING,
            index = index.unwrap_or("*"),
            count = buckets.len(),
            unknown = buckets.iter().filter(|b| b.format() == BucketFormat::Unknown).count(),
            "Listed archived buckets"
        );

        Ok(BucketListing::new(buckets))
    }
}

impl std::fmt::Debug for ListingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingService")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use shuttl_core::bucket::{BucketKey, BucketLocation};
    use shuttl_opendal::{FsConfig, OpendalArchive, StorageConfig};
    use tempfile::TempDir;

    use super::*;
    use crate::metadata::BucketMetadata;

    struct Fixture {
        _remote: TempDir,
        config: ArchiveConfig,
        archive: Arc<dyn ArchiveFileSystem>,
        paths: PathResolver,
    }

    impl Fixture {
        fn new(priority: Vec<BucketFormat>) -> Self {
            let remote = TempDir::new().unwrap();
            let archive =
                OpendalArchive::new(StorageConfig::Fs(FsConfig::new(remote.path()))).unwrap();
            let config = ArchiveConfig::new("/unused", "cluster", "server")
                .with_format_priority(priority);
            Self {
                _remote: remote,
                config,
                archive: Arc::new(archive),
                paths: PathResolver::new(),
            }
        }

        async fn archived(&self, index: &str, name: &str, format: BucketFormat, size: u64) {
            let key = BucketKey::new(index, name).unwrap();
            let data = self.paths.archived_data_path(format, &key);
            self.archive.put_bytes(b"data".to_vec(), &data).await.unwrap();

            let bucket = Bucket::new(key.clone(), BucketLocation::Remote(data), format)
                .with_size(Some(size));
            let metadata = BucketMetadata::new(&bucket, &self.config);
            self.archive
                .put_bytes(metadata.to_bytes().unwrap(), &self.paths.metadata_path(format, &key))
                .await
                .unwrap();
        }

        fn service(&self) -> ListingService {
            ListingService::new(&self.config, self.archive.clone(), self.paths.clone())
        }
    }

    #[test]
    fn test_display_size() {
        assert_eq!(display_size(0), "0 bytes");
        assert_eq!(display_size(512), "512 bytes");
        assert_eq!(display_size(1024), "1 KB");
        assert_eq!(display_size(2 * 1024 * 1024 + 17), "2 MB");
        assert_eq!(display_size(5 << 30), "5 GB");
    }

    #[tokio::test]
    async fn test_priority_format_is_listed() {
        let fx = Fixture::new(vec![BucketFormat::Tgz, BucketFormat::SplunkBucket]);
        fx.archived("main", "db_200_100_0", BucketFormat::SplunkBucket, 4096).await;
        fx.archived("main", "db_200_100_0", BucketFormat::Tgz, 1024).await;
        fx.archived("other", "db_400_300_1", BucketFormat::SplunkBucket, 1024).await;

        let service = fx.service();
        assert_eq!(service.list_indexes().await.unwrap(), vec!["main", "other"]);

        let listing = service.list_buckets(None, None, None).await.unwrap();
        assert_eq!(listing.buckets.len(), 2);
        assert_eq!(listing.buckets[0].name(), "db_200_100_0");
        assert_eq!(listing.buckets[0].format(), BucketFormat::Tgz);
        assert_eq!(listing.buckets[1].format(), BucketFormat::SplunkBucket);
        assert_eq!(listing.total_size, 2048);
        assert_eq!(listing.total_size_display, "2 KB");

        let listing = service.list_buckets(Some("other"), None, None).await.unwrap();
        assert_eq!(listing.buckets.len(), 1);
        assert_eq!(listing.buckets[0].index(), "other");
    }

    #[tokio::test]
    async fn test_falls_back_to_present_format() {
        let fx = Fixture::new(vec![BucketFormat::Tgz]);
        fx.archived("main", "db_200_100_0", BucketFormat::SplunkBucket, 10).await;

        let listing = fx.service().list_buckets(Some("main"), None, None).await.unwrap();
        assert_eq!(listing.buckets.len(), 1);
        assert_eq!(listing.buckets[0].format(), BucketFormat::SplunkBucket);
        assert_eq!(listing.total_size_display, "10 bytes");
    }

    #[tokio::test]
    async fn test_time_filter_and_empty_archive() {
        let fx = Fixture::new(vec![BucketFormat::SplunkBucket]);
        let service = fx.service();
        assert!(service.list_indexes().await.unwrap().is_empty());
        assert!(service.list_buckets(None, None, None).await.unwrap().buckets.is_empty());

        fx.archived("main", "db_200_100_0", BucketFormat::SplunkBucket, 1).await;
        fx.archived("main", "db_900_800_1", BucketFormat::SplunkBucket, 1).await;

        let at = |s| Timestamp::from_second(s).unwrap();
        let listing = service
            .list_buckets(Some("main"), Some(at(150)), Some(at(300)))
            .await
            .unwrap();
        let names: Vec<_> = listing.buckets.iter().map(Bucket::name).collect();
        assert_eq!(names, vec!["db_200_100_0"]);
    }
}
