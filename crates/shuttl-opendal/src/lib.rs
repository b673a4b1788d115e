#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod archive_fs;
mod backend;
mod config;
mod error;
mod fs;
mod s3;
mod webhdfs;

#[doc(hidden)]
pub mod prelude;

pub use archive_fs::ArchiveFileSystem;
pub use backend::OpendalArchive;
pub use config::{FsConfig, S3Config, StorageConfig, WebhdfsConfig};
pub use error::{StorageError, StorageResult};

/// Tracing target for storage operations.
pub const TRACING_TARGET: &str = "shuttl_opendal";
