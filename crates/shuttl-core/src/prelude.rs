//! Convenient re-exports for common use.

pub use crate::bucket::{
    Bucket, BucketFormat, BucketKey, BucketLocation, BucketTimeRange, LocalBucket,
};
pub use crate::config::ArchiveConfig;
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::path::RemotePath;
