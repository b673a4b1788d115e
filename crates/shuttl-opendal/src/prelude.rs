//! Prelude module for convenient imports.

pub use crate::archive_fs::ArchiveFileSystem;
pub use crate::backend::OpendalArchive;
pub use crate::config::StorageConfig;
pub use crate::error::{StorageError, StorageResult};
