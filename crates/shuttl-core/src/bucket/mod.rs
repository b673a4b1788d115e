//! Bucket data model.
//!
//! A [`Bucket`] is a value: converting or relocating it produces a new
//! bucket with the same [`BucketKey`], the original is never mutated.

mod format;
mod key;
mod local;
mod time_range;

use std::path::{Path, PathBuf};

pub use format::BucketFormat;
pub use key::{BucketKey, METADATA_FILE_NAME, validate_segment};
pub use local::LocalBucket;
use serde::{Deserialize, Serialize};
pub use time_range::BucketTimeRange;

use crate::path::RemotePath;

/// Where the files of a bucket live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum BucketLocation {
    /// On local disk.
    Local(PathBuf),
    /// In the archive file system.
    Remote(RemotePath),
}

/// An immutable unit of indexed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    key: BucketKey,
    location: BucketLocation,
    format: BucketFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

impl Bucket {
    /// Creates a new bucket of unknown size.
    pub fn new(key: BucketKey, location: BucketLocation, format: BucketFormat) -> Self {
        Self {
            key,
            location,
            format,
            size: None,
        }
    }

    /// Sets the size in bytes.
    #[must_use]
    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    /// Returns a bucket with the same identity in another format and location.
    #[must_use]
    pub fn converted(&self, format: BucketFormat, location: BucketLocation) -> Self {
        Self {
            key: self.key.clone(),
            location,
            format,
            size: None,
        }
    }

    pub fn key(&self) -> &BucketKey {
        &self.key
    }

    pub fn index(&self) -> &str {
        self.key.index()
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn format(&self) -> BucketFormat {
        self.format
    }

    pub fn location(&self) -> &BucketLocation {
        &self.location
    }

    /// Size in bytes, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Local path, if the bucket is on local disk.
    pub fn local_path(&self) -> Option<&Path> {
        match &self.location {
            BucketLocation::Local(path) => Some(path),
            BucketLocation::Remote(_) => None,
        }
    }

    /// Remote path, if the bucket is in the archive.
    pub fn remote_path(&self) -> Option<&RemotePath> {
        match &self.location {
            BucketLocation::Remote(path) => Some(path),
            BucketLocation::Local(_) => None,
        }
    }

    /// Time range encoded in the bucket name.
    pub fn time_range(&self) -> Option<BucketTimeRange> {
        BucketTimeRange::from_bucket_name(self.key.name())
    }
}
