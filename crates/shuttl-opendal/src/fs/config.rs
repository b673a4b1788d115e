//! Local filesystem configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Archive rooted in a local (or locally mounted) directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Absolute directory used as the archive root.
    pub root: PathBuf,
}

impl FsConfig {
    /// Creates a new filesystem configuration.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}
