use std::path::PathBuf;

use shuttl_core::ArchiveConfig;
use shuttl_core::bucket::BucketKey;

/// Decides where thawed buckets are placed on local disk.
#[derive(Debug, Clone)]
pub struct ThawLocationProvider {
    thaw_dir: PathBuf,
}

impl ThawLocationProvider {
    pub fn new(thaw_dir: impl Into<PathBuf>) -> Self {
        Self {
            thaw_dir: thaw_dir.into(),
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.thaw_dir())
    }

    /// `<thaw_dir>/<index>/<bucket>`
    pub fn location_for(&self, key: &BucketKey) -> PathBuf {
        self.thaw_dir.join(key.index()).join(key.name())
    }
}
