//! Metadata stored next to archived bucket data.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use shuttl_core::bucket::{Bucket, BucketFormat, BucketTimeRange};
use shuttl_core::{ArchiveConfig, Result};

/// Contents of `bucket.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMetadata {
    pub index: String,
    pub name: String,
    pub format: BucketFormat,
    /// Size of the archived data in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<BucketTimeRange>,
    pub cluster: String,
    pub server: String,
    pub archived_at: Timestamp,
}

impl BucketMetadata {
    /// Describes `bucket` as archived now by this process.
    pub fn new(bucket: &Bucket, config: &ArchiveConfig) -> Self {
        Self {
            index: bucket.index().to_owned(),
            name: bucket.name().to_owned(),
            format: bucket.format(),
            size: bucket.size(),
            time_range: bucket.time_range(),
            cluster: config.cluster_name.clone(),
            server: config.server_name.clone(),
            archived_at: Timestamp::now(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
