//! Common error type definitions.

use std::io;

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Used as the source of structured errors so that any underlying error
/// (I/O, storage backend, serialization) can be carried along.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur while archiving or thawing buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Bad path, bad name or bad arguments.
    InvalidInput,
    /// Missing local or remote object.
    NotFound,
    /// Path exists but is not a directory.
    NotADirectory,
    /// Destination already exists and was left untouched.
    OverwriteDenied,
    /// Bucket is already being handled by another holder.
    LockUnavailable,
    /// Collaborator wiring or configuration failed.
    Configuration,
    /// Remote storage backend failure.
    Storage,
    /// Local I/O failure.
    Io,
    /// Serialization/deserialization error.
    Serialization,
}

/// A structured error type for shuttl operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new not a directory error.
    pub fn not_a_directory() -> Self {
        Self::new(ErrorKind::NotADirectory)
    }

    /// Creates a new overwrite denied error.
    pub fn overwrite_denied() -> Self {
        Self::new(ErrorKind::OverwriteDenied)
    }

    /// Creates a new lock unavailable error.
    pub fn lock_unavailable() -> Self {
        Self::new(ErrorKind::LockUnavailable)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new storage error.
    pub fn storage() -> Self {
        Self::new(ErrorKind::Storage)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns true if a missing object caused this error.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns true if an existing destination caused this error.
    pub fn is_overwrite_denied(&self) -> bool {
        self.kind == ErrorKind::OverwriteDenied
    }

    /// Returns true if another holder owns the bucket lock.
    pub fn is_lock_unavailable(&self) -> bool {
        self.kind == ErrorKind::LockUnavailable
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => ErrorKind::OverwriteDenied,
            io::ErrorKind::NotADirectory => ErrorKind::NotADirectory,
            _ => ErrorKind::Io,
        };

        Self::new(kind).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization().with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds_are_mapped() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_not_found());

        let err: Error = io::Error::new(io::ErrorKind::AlreadyExists, "there").into();
        assert!(err.is_overwrite_denied());

        let err: Error = io::Error::other("boom").into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_display_includes_message() {
        let err = Error::lock_unavailable().with_message("main/db_1_2_0");
        assert_eq!(err.to_string(), "LockUnavailable: main/db_1_2_0");
        assert_eq!(err.kind_str(), "lock_unavailable");
    }
}
