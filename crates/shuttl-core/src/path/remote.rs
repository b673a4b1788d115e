//! Locations in the archive file system.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized location relative to the archive root.
///
/// Segments are separated by `/`; leading, trailing and repeated separators
/// are dropped, so `"/TGZ//main/"` and `"TGZ/main"` are the same path. The
/// empty path is the archive root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RemotePath {
    inner: String,
}

impl RemotePath {
    /// Creates a path, normalizing separators.
    pub fn new(path: impl AsRef<str>) -> Self {
        let inner = path
            .as_ref()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        Self { inner }
    }

    /// The archive root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns true for the archive root.
    pub fn is_root(&self) -> bool {
        self.inner.is_empty()
    }

    /// Appends one or more segments.
    #[must_use]
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        if self.is_root() {
            return Self::new(segment);
        }
        Self::new(format!("{}/{}", self.inner, segment.as_ref()))
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(match self.inner.rsplit_once('/') {
            Some((parent, _)) => Self::new(parent),
            None => Self::root(),
        })
    }

    /// Returns the last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.inner.rsplit('/').next()
    }

    /// Returns the path relative to `base` if it lies below it.
    pub fn strip_prefix(&self, base: &RemotePath) -> Option<&str> {
        if base.is_root() {
            return Some(&self.inner);
        }
        self.inner
            .strip_prefix(base.inner.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Path in file form (`a/b`).
    pub fn as_file(&self) -> &str {
        &self.inner
    }

    /// Path in directory form (`a/b/`, or `/` for the root).
    pub fn as_dir(&self) -> String {
        if self.is_root() {
            return "/".to_owned();
        }
        format!("{}/", self.inner)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.inner)
    }
}

impl From<String> for RemotePath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for RemotePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<RemotePath> for String {
    fn from(value: RemotePath) -> Self {
        value.inner
    }
}
