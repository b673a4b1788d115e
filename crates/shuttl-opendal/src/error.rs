//! Storage error types.

use std::io;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to initialize the storage backend.
    #[error("storage initialization failed: {0}")]
    Init(String),

    /// Archive root URI could not be understood.
    #[error("invalid archive uri: {0}")]
    InvalidUri(String),

    /// Path cannot be used for this operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// File or object not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Destination already exists and was left untouched.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Operation is not supported by the backend.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Local I/O failure.
    #[error("local i/o failed: {0}")]
    Io(#[from] io::Error),

    /// Backend-specific error.
    #[error("backend error: {0}")]
    Backend(opendal::Error),
}

impl StorageError {
    /// Creates a new initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Creates a new invalid uri error.
    pub fn invalid_uri(msg: impl Into<String>) -> Self {
        Self::InvalidUri(msg.into())
    }

    /// Creates a new invalid path error.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Creates a new already exists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Returns true if the error means "nothing there".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(err) => err.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        use opendal::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::AlreadyExists => Self::AlreadyExists(err.to_string()),
            ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            ErrorKind::ConfigInvalid => Self::Init(err.to_string()),
            _ => Self::Backend(err),
        }
    }
}

impl From<StorageError> for shuttl_core::Error {
    fn from(err: StorageError) -> Self {
        use shuttl_core::Error;

        match err {
            StorageError::Io(err) => Error::from(err),
            StorageError::InvalidPath(msg) => Error::invalid_input().with_message(msg),
            StorageError::NotFound(msg) => Error::not_found().with_message(msg),
            StorageError::AlreadyExists(msg) => Error::overwrite_denied().with_message(msg),
            StorageError::Init(msg) | StorageError::InvalidUri(msg) => {
                Error::configuration().with_message(msg)
            }
            StorageError::Unsupported(msg) => Error::storage().with_message(msg),
            StorageError::Backend(err) => Error::storage().with_source(err),
        }
    }
}
