//! The archive file system capability.

use std::path::Path;

use async_trait::async_trait;
use shuttl_core::Result;
use shuttl_core::path::RemotePath;

/// Operations the archiver needs from remote storage.
///
/// Every write refuses to replace what is already there: `put`,
/// `put_atomically`, `put_bytes` and `move_path` fail with
/// `OverwriteDenied` and leave the existing object untouched. Reads of
/// missing objects fail with `NotFound`, except `list`, which treats a
/// missing path as empty.
#[async_trait]
pub trait ArchiveFileSystem: Send + Sync {
    /// Downloads a remote file or directory tree to `local`.
    ///
    /// Fails with `OverwriteDenied` if `local` already exists.
    async fn get(&self, remote: &RemotePath, local: &Path) -> Result<()>;

    /// Uploads a local file or directory tree to `remote`.
    async fn put(&self, local: &Path, remote: &RemotePath) -> Result<()>;

    /// Uploads to a temporary location and then moves into `remote`, so a
    /// failed upload never leaves a partial object at `remote`.
    async fn put_atomically(&self, local: &Path, remote: &RemotePath) -> Result<()>;

    /// Writes a small object from memory, atomically.
    async fn put_bytes(&self, bytes: Vec<u8>, remote: &RemotePath) -> Result<()>;

    /// Immediate children of a directory, the path itself for a file, and
    /// nothing for a missing path.
    async fn list(&self, remote: &RemotePath) -> Result<Vec<RemotePath>>;

    /// Removes a file or directory tree. Missing paths are not an error.
    async fn delete_recursively(&self, remote: &RemotePath) -> Result<()>;

    /// Relocates `from` to `to` within the archive.
    async fn move_path(&self, from: &RemotePath, to: &RemotePath) -> Result<()>;

    /// Returns true if a file or directory exists at `remote`.
    async fn exists(&self, remote: &RemotePath) -> Result<bool>;

    /// Reads a small object into memory.
    async fn read(&self, remote: &RemotePath) -> Result<Vec<u8>>;
}
