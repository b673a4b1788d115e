//! Archive path module
//!
//! Locations in the archive are expressed as [`RemotePath`] values relative
//! to the configured archive root, independent of the storage backend.

mod remote;

pub use remote::RemotePath;
