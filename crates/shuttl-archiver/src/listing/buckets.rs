use std::sync::Arc;

use shuttl_core::Result;
use shuttl_core::bucket::{Bucket, BucketFormat, BucketKey, BucketLocation};
use shuttl_opendal::ArchiveFileSystem;

use super::ArchivedIndexesLister;
use crate::TRACING_TARGET_LISTING;
use crate::metadata::BucketMetadata;
use crate::paths::PathResolver;

/// Lists archived buckets, one entry per format a bucket is stored in.
#[derive(Clone)]
pub struct ArchiveBucketsLister {
    archive: Arc<dyn ArchiveFileSystem>,
    resolver: PathResolver,
    indexes: ArchivedIndexesLister,
}

impl ArchiveBucketsLister {
    pub fn new(archive: Arc<dyn ArchiveFileSystem>, resolver: PathResolver) -> Self {
        let indexes = ArchivedIndexesLister::new(archive.clone(), resolver.clone());
        Self {
            archive,
            resolver,
            indexes,
        }
    }

    /// Buckets of every archived index.
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let mut buckets = Vec::new();
        for index in self.indexes.list_indexes().await? {
            buckets.extend(self.list_buckets_in_index(&index).await?);
        }
        Ok(buckets)
    }

    /// Buckets of `index` in every format whose data is in place.
    ///
    /// Sizes come from the bucket metadata when it can be read.
    pub async fn list_buckets_in_index(&self, index: &str) -> Result<Vec<Bucket>> {
        let mut buckets = Vec::new();
        for format in BucketFormat::ARCHIVABLE {
            let index_root = self.resolver.index_root(format, index);
            for bucket_root in self.archive.list(&index_root).await? {
                let Some(name) = bucket_root.name() else {
                    continue;
                };
                let key = match BucketKey::new(index, name) {
                    Ok(key) => key,
                    Err(err) => {
                        tracing::warn!(
                            target: TRACING_TARGET_LISTING,
                            index = %index,
                            path = %bucket_root,
                            error = %err,
                            "Skipping unrecognized archive entry"
                        );
                        continue;
                    }
                };

                let data_path = self.resolver.archived_data_path(format, &key);
                if !self.archive.exists(&data_path).await? {
                    continue;
                }

                let size = self.archived_size(format, &key).await;
                buckets.push(
                    Bucket::new(key, BucketLocation::Remote(data_path), format).with_size(size),
                );
            }
        }
        Ok(buckets)
    }

    async fn archived_size(&self, format: BucketFormat, key: &BucketKey) -> Option<u64> {
        let path = self.resolver.metadata_path(format, key);
        let bytes = self.archive.read(&path).await.ok()?;
        match BucketMetadata::from_bytes(&bytes) {
            Ok(metadata) => metadata.size,
            Err(err) => {
                tracing::debug!(
                    target: TRACING_TARGET_LISTING,
                    remote = %path,
                    error = %err,
                    "Unreadable bucket metadata"
                );
                None
            }
        }
    }
}
