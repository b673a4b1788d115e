//! CLI configuration management.
//!
//! ```text
//! ArchiverArgs
//! ├── archive: ArchiveConfig   # Local root, formats, cluster/server, lock lease
//! └── storage: StorageArgs     # Archive root URI, S3 overrides, remote tmp dir
//! ```
//!
//! Every option can be given as a flag or as a `SHUTTL_*` environment
//! variable. Use `--help` to see them all.

mod storage;

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use shuttl_archiver::ArchiverState;
use shuttl_archiver::locker::FileLeaseProvider;
use shuttl_core::ArchiveConfig;
pub use storage::StorageArgs;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Configuration shared by every entry point.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct ArchiverArgs {
    /// Local layout, formats and identity of this archiver.
    #[clap(flatten)]
    pub archive: ArchiveConfig,

    /// Archive storage.
    #[clap(flatten)]
    pub storage: StorageArgs,
}

impl ArchiverArgs {
    /// Validates the configuration and wires the archiver services with
    /// lease file locks.
    pub fn build_state(&self) -> anyhow::Result<ArchiverState> {
        self.archive
            .validate()
            .context("invalid archive configuration")?;
        self.log();

        let archive = self.storage.open_archive()?;
        let locks = FileLeaseProvider::from_config(&self.archive);

        ArchiverState::new(self.archive.clone(), Arc::new(archive), Arc::new(locks))
            .context("failed to initialize archiver")
    }

    /// Logs the configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            local_root = %self.archive.local_root.display(),
            lock_dir = %self.archive.lock_dir().display(),
            thaw_dir = %self.archive.thaw_dir().display(),
            archive_formats = ?self.archive.archive_formats,
            format_priority = ?self.archive.format_priority,
            cluster = %self.archive.cluster_name,
            server = %self.archive.server_name,
            lock_lease_secs = self.archive.lock_lease_secs,
            "Archiver configuration"
        );
    }
}

/// Loads environment variables from a .env file if the dotenv feature is
/// enabled. Must run before arguments are parsed.
#[cfg(feature = "dotenv")]
pub fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("Warning: failed to load .env file: {err}");
    }
}

/// No-op when dotenv feature is disabled.
#[cfg(not(feature = "dotenv"))]
pub fn load_dotenv() {}

/// Logs build information at debug level.
pub fn log_build_info(binary: &'static str) {
    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        binary,
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        features = ?enabled_features(),
        "Build information"
    );
}

/// Returns a list of enabled compile-time features.
fn enabled_features() -> Vec<&'static str> {
    [
        cfg!(feature = "s3").then_some("s3"),
        cfg!(feature = "webhdfs").then_some("webhdfs"),
        cfg!(feature = "dotenv").then_some("dotenv"),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Parses a listing bound: an RFC 3339 timestamp, a date (midnight UTC) or
/// epoch seconds.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, String> {
    if let Ok(timestamp) = value.parse::<Timestamp>() {
        return Ok(timestamp);
    }
    if let Ok(date) = value.parse::<Date>() {
        return date
            .to_zoned(TimeZone::UTC)
            .map(|zoned| zoned.timestamp())
            .map_err(|e| e.to_string());
    }
    if let Ok(seconds) = value.parse::<i64>() {
        return Timestamp::from_second(seconds).map_err(|e| e.to_string());
    }
    Err(format!("'{value}' is not a timestamp, a date or epoch seconds"))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[clap(flatten)]
        args: ArchiverArgs,
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1970-01-02").unwrap().as_second(), 86_400);
        assert_eq!(parse_timestamp("1336330000").unwrap().as_second(), 1_336_330_000);
        assert_eq!(
            parse_timestamp("2012-05-06T18:46:40Z").unwrap().as_second(),
            1_336_330_000
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_flags() {
        let cli = TestCli::try_parse_from([
            "test",
            "--local-root",
            "/opt/shuttl",
            "--archive-root",
            "s3://frozen/prod",
            "--cluster-name",
            "idx",
            "--server-name",
            "idx-1",
            "--archive-formats",
            "splunk_bucket,TGZ",
        ])
        .unwrap();

        assert_eq!(cli.args.archive.archive_formats.len(), 2);
        assert_eq!(cli.args.storage.archive_tmp_dir, "_tmp");
        assert!(cli.args.archive.validate().is_ok());
    }

    #[tokio::test]
    async fn test_build_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = ArchiverArgs {
            archive: ArchiveConfig::new(dir.path().join("local"), "idx", "idx-1"),
            storage: StorageArgs {
                archive_root: dir.path().join("remote").display().to_string(),
                s3_region: None,
                s3_endpoint: None,
                archive_tmp_dir: "_tmp".to_owned(),
            },
        };
        std::fs::create_dir_all(dir.path().join("remote")).unwrap();

        let state = args.build_state().unwrap();
        assert!(state.listing.list_indexes().await.unwrap().is_empty());
    }
}
