//! Archive storage configuration.

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use shuttl_opendal::{OpendalArchive, StorageConfig};

use crate::TRACING_TARGET_CONFIG;

/// Default name of the remote directory used by atomic puts.
const DEFAULT_ARCHIVE_TMP_DIR: &str = "_tmp";

/// Where the archive lives.
///
/// # Environment Variables
///
/// - `SHUTTL_ARCHIVE_ROOT` - archive root URI (`/path`, `file:///path`,
///   `s3://bucket/prefix` or `webhdfs://namenode:9870/path`)
/// - `SHUTTL_S3_REGION` - region of the S3 bucket
/// - `SHUTTL_S3_ENDPOINT` - endpoint of S3 compatible storage
/// - `SHUTTL_ARCHIVE_TMP_DIR` - remote directory for in-flight uploads (default: `_tmp`)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct StorageArgs {
    /// Archive root URI.
    #[arg(long, env = "SHUTTL_ARCHIVE_ROOT")]
    pub archive_root: String,

    /// Region of the S3 bucket.
    #[arg(long, env = "SHUTTL_S3_REGION")]
    pub s3_region: Option<String>,

    /// Endpoint of S3 compatible storage such as MinIO.
    #[arg(long, env = "SHUTTL_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Remote directory, below the archive root, for uploads in flight.
    #[arg(long, env = "SHUTTL_ARCHIVE_TMP_DIR", default_value = DEFAULT_ARCHIVE_TMP_DIR)]
    pub archive_tmp_dir: String,
}

impl StorageArgs {
    /// Resolves the archive root URI and the S3 overrides.
    pub fn storage_config(&self) -> anyhow::Result<StorageConfig> {
        let config = StorageConfig::from_uri(&self.archive_root)
            .with_context(|| format!("invalid archive root '{}'", self.archive_root))?;

        Ok(match config {
            StorageConfig::S3(mut s3) => {
                if let Some(region) = &self.s3_region {
                    s3 = s3.with_region(region);
                }
                if let Some(endpoint) = &self.s3_endpoint {
                    s3 = s3.with_endpoint(endpoint);
                }
                StorageConfig::S3(s3)
            }
            other => other,
        })
    }

    /// Opens the archive.
    pub fn open_archive(&self) -> anyhow::Result<OpendalArchive> {
        let config = self.storage_config()?;

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            backend = config.backend_name(),
            root = %config.root(),
            tmp_dir = %self.archive_tmp_dir,
            "Archive storage"
        );

        OpendalArchive::new(config)
            .and_then(|archive| archive.with_tmp_dir(&self.archive_tmp_dir))
            .context("failed to initialize archive storage")
    }
}
