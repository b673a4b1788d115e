//! Archiver configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::bucket::BucketFormat;
use crate::error::{Error, Result};

// Default values
const DEFAULT_LOCK_LEASE_SECS: u64 = 300;
const STAGING_DIR: &str = "staging";
const RECEIPTS_DIR: &str = "receipts";
const WORK_DIR: &str = "work";
const LOCKS_DIR: &str = "locks";
const THAW_DIR: &str = "thaw";

fn default_archive_formats() -> Vec<BucketFormat> {
    vec![BucketFormat::SplunkBucket]
}

fn default_format_priority() -> Vec<BucketFormat> {
    vec![BucketFormat::SplunkBucket, BucketFormat::Tgz]
}

fn default_lock_lease_secs() -> u64 {
    DEFAULT_LOCK_LEASE_SECS
}

/// Resolved configuration for archiving and thawing buckets.
///
/// Constructed once per process and handed to every component that needs
/// it; nothing reads configuration from global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ArchiveConfig {
    /// Local directory holding staging, receipts and conversion work
    #[cfg_attr(feature = "config", arg(long = "local-root", env = "SHUTTL_LOCAL_ROOT"))]
    pub local_root: PathBuf,

    /// Directory for bucket lock leases (defaults to `<local-root>/locks`)
    #[cfg_attr(feature = "config", arg(long = "lock-dir", env = "SHUTTL_LOCK_DIR"))]
    pub lock_dir: Option<PathBuf>,

    /// Directory thawed buckets are restored into (defaults to `<local-root>/thaw`)
    #[cfg_attr(feature = "config", arg(long = "thaw-dir", env = "SHUTTL_THAW_DIR"))]
    pub thaw_dir: Option<PathBuf>,

    /// Formats written for every frozen bucket
    #[cfg_attr(
        feature = "config",
        arg(
            long = "archive-formats",
            env = "SHUTTL_ARCHIVE_FORMATS",
            value_delimiter = ',',
            default_values_t = default_archive_formats()
        )
    )]
    #[serde(default = "default_archive_formats")]
    pub archive_formats: Vec<BucketFormat>,

    /// Preferred formats for listing and thawing, most preferred first
    #[cfg_attr(
        feature = "config",
        arg(
            long = "format-priority",
            env = "SHUTTL_FORMAT_PRIORITY",
            value_delimiter = ',',
            default_values_t = default_format_priority()
        )
    )]
    #[serde(default = "default_format_priority")]
    pub format_priority: Vec<BucketFormat>,

    /// Name of the indexer cluster the buckets come from
    #[cfg_attr(
        feature = "config",
        arg(long = "cluster-name", env = "SHUTTL_CLUSTER_NAME")
    )]
    pub cluster_name: String,

    /// Name of the indexer server the buckets come from
    #[cfg_attr(feature = "config", arg(long = "server-name", env = "SHUTTL_SERVER_NAME"))]
    pub server_name: String,

    /// Bucket lock lease duration in seconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "lock-lease-secs",
            env = "SHUTTL_LOCK_LEASE_SECS",
            default_value_t = DEFAULT_LOCK_LEASE_SECS
        )
    )]
    #[serde(default = "default_lock_lease_secs")]
    pub lock_lease_secs: u64,
}

impl ArchiveConfig {
    /// Creates a configuration with default formats and lease.
    pub fn new(
        local_root: impl Into<PathBuf>,
        cluster_name: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            local_root: local_root.into(),
            lock_dir: None,
            thaw_dir: None,
            archive_formats: default_archive_formats(),
            format_priority: default_format_priority(),
            cluster_name: cluster_name.into(),
            server_name: server_name.into(),
            lock_lease_secs: DEFAULT_LOCK_LEASE_SECS,
        }
    }

    #[must_use]
    pub fn with_archive_formats(mut self, formats: impl IntoIterator<Item = BucketFormat>) -> Self {
        self.archive_formats = formats.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_format_priority(mut self, formats: impl IntoIterator<Item = BucketFormat>) -> Self {
        self.format_priority = formats.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_lock_dir(mut self, lock_dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(lock_dir.into());
        self
    }

    #[must_use]
    pub fn with_thaw_dir(mut self, thaw_dir: impl Into<PathBuf>) -> Self {
        self.thaw_dir = Some(thaw_dir.into());
        self
    }

    #[must_use]
    pub fn with_lock_lease_secs(mut self, secs: u64) -> Self {
        self.lock_lease_secs = secs;
        self
    }

    /// Checks the configuration for values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.archive_formats.is_empty() {
            return Err(Error::configuration().with_message("no archive formats configured"));
        }

        let mut seen = HashSet::new();
        for format in &self.archive_formats {
            if !format.is_archivable() {
                return Err(Error::configuration()
                    .with_message(format!("format {format} cannot be archived")));
            }
            if !seen.insert(*format) {
                return Err(Error::configuration()
                    .with_message(format!("archive format {format} is listed twice")));
            }
        }

        if self.format_priority.is_empty() {
            return Err(Error::configuration().with_message("format priority list is empty"));
        }

        if self.lock_lease_secs == 0 {
            return Err(Error::configuration().with_message("lock lease must be positive"));
        }

        if self.cluster_name.trim().is_empty() {
            return Err(Error::configuration().with_message("cluster name is empty"));
        }

        if self.server_name.trim().is_empty() {
            return Err(Error::configuration().with_message("server name is empty"));
        }

        Ok(())
    }

    /// Root of staged buckets: `<local-root>/staging`.
    #[inline]
    pub fn staging_dir(&self) -> PathBuf {
        self.local_root.join(STAGING_DIR)
    }

    /// Root of copy receipts: `<local-root>/receipts`.
    #[inline]
    pub fn receipts_dir(&self) -> PathBuf {
        self.local_root.join(RECEIPTS_DIR)
    }

    /// Scratch space for format conversion: `<local-root>/work`.
    #[inline]
    pub fn work_dir(&self) -> PathBuf {
        self.local_root.join(WORK_DIR)
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir
            .clone()
            .unwrap_or_else(|| self.local_root.join(LOCKS_DIR))
    }

    pub fn thaw_dir(&self) -> PathBuf {
        self.thaw_dir
            .clone()
            .unwrap_or_else(|| self.local_root.join(THAW_DIR))
    }

    #[inline]
    pub fn lock_lease(&self) -> Duration {
        Duration::from_secs(self.lock_lease_secs)
    }

    #[inline]
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }
}
