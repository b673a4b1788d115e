#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for bucket model operations.
pub const TRACING_TARGET_BUCKET: &str = "shuttl_core::bucket";

pub mod bucket;
mod config;
mod error;
pub mod fs;
pub mod path;
pub mod prelude;

pub use config::ArchiveConfig;
pub use error::{BoxedError, Error, ErrorKind, Result};
