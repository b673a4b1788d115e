//! Archive namespace.

pub use shuttl_core::bucket::METADATA_FILE_NAME;
use shuttl_core::bucket::{BucketFormat, BucketKey};
use shuttl_core::path::RemotePath;

/// Maps `(format, index, bucket)` to locations in the archive.
///
/// The layout is `<FORMAT>/<index>/<bucket>/` per bucket, holding the
/// bucket data (`<bucket>` or `<bucket>.<ext>`) and `bucket.json`. Since
/// index and bucket names are validated path segments and no bucket may be
/// named `bucket.json`, distinct triples never share a location and data
/// never shares one with metadata. The mapping must stay stable across versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathResolver {
    root: RemotePath,
}

impl PathResolver {
    /// Resolver for an archive laid out at the storage root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver for an archive laid out below `root`.
    pub fn with_root(root: RemotePath) -> Self {
        Self { root }
    }

    /// `<FORMAT>`
    pub fn format_root(&self, format: BucketFormat) -> RemotePath {
        self.root.join(format.as_ref())
    }

    /// `<FORMAT>/<index>`
    pub fn index_root(&self, format: BucketFormat, index: &str) -> RemotePath {
        self.format_root(format).join(index)
    }

    /// `<FORMAT>/<index>/<bucket>`
    pub fn bucket_root(&self, format: BucketFormat, key: &BucketKey) -> RemotePath {
        self.index_root(format, key.index()).join(key.name())
    }

    /// Location of the bucket data in `format`.
    pub fn archived_data_path(&self, format: BucketFormat, key: &BucketKey) -> RemotePath {
        let file_name = match format.extension() {
            Some(ext) => format!("{}.{ext}", key.name()),
            None => key.name().to_owned(),
        };
        self.bucket_root(format, key).join(file_name)
    }

    /// Location of the metadata object for the bucket in `format`.
    pub fn metadata_path(&self, format: BucketFormat, key: &BucketKey) -> RemotePath {
        self.bucket_root(format, key).join(METADATA_FILE_NAME)
    }
}
