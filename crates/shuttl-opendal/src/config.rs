//! Storage configuration types.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{StorageError, StorageResult};
pub use crate::fs::FsConfig;
pub use crate::s3::S3Config;
pub use crate::webhdfs::WebhdfsConfig;

/// Default WebHDFS port of a Hadoop 3 namenode.
const DEFAULT_WEBHDFS_PORT: u16 = 9870;

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum StorageConfig {
    /// Local filesystem.
    Fs(FsConfig),
    /// Amazon S3 compatible storage.
    S3(S3Config),
    /// Hadoop WebHDFS.
    Webhdfs(WebhdfsConfig),
}

impl StorageConfig {
    /// Parses an archive root URI.
    ///
    /// A bare path or a `file://` URI selects the local filesystem,
    /// `s3://bucket/prefix` selects S3 and `webhdfs://host:port/path`
    /// selects WebHDFS.
    pub fn from_uri(uri: &str) -> StorageResult<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(StorageError::invalid_uri("archive root is empty"));
        }

        if !uri.contains("://") {
            return Ok(Self::Fs(FsConfig::new(PathBuf::from(uri))));
        }

        let url = Url::parse(uri).map_err(|e| StorageError::invalid_uri(format!("{uri}: {e}")))?;
        let path = url.path().trim_matches('/');

        match url.scheme() {
            "file" => {
                let root = url
                    .to_file_path()
                    .map_err(|_| StorageError::invalid_uri(format!("{uri}: not a local path")))?;
                Ok(Self::Fs(FsConfig::new(root)))
            }
            "s3" => {
                let bucket = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| StorageError::invalid_uri(format!("{uri}: missing bucket")))?;
                let mut config = S3Config::new(bucket);
                if !path.is_empty() {
                    config = config.with_prefix(path);
                }
                Ok(Self::S3(config))
            }
            "webhdfs" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| StorageError::invalid_uri(format!("{uri}: missing namenode")))?;
                let port = url.port().unwrap_or(DEFAULT_WEBHDFS_PORT);
                Ok(Self::Webhdfs(WebhdfsConfig::new(
                    format!("http://{host}:{port}"),
                    format!("/{path}"),
                )))
            }
            scheme => Err(StorageError::invalid_uri(format!(
                "{uri}: unsupported scheme '{scheme}'"
            ))),
        }
    }

    /// Returns the backend name as a static string.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Fs(_) => "fs",
            Self::S3(_) => "s3",
            Self::Webhdfs(_) => "webhdfs",
        }
    }

    /// Directory holding the archive when it lives on the local filesystem.
    pub fn local_root(&self) -> Option<&Path> {
        match self {
            Self::Fs(config) => Some(&config.root),
            _ => None,
        }
    }

    /// Human readable archive root, for logs.
    pub fn root(&self) -> String {
        match self {
            Self::Fs(config) => config.root.display().to_string(),
            Self::S3(config) => format!(
                "s3://{}/{}",
                config.bucket,
                config.prefix.as_deref().unwrap_or_default()
            ),
            Self::Webhdfs(config) => format!("{}{}", config.endpoint, config.root),
        }
    }
}

impl FromStr for StorageConfig {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}
