//! Hadoop WebHDFS configuration.

use serde::{Deserialize, Serialize};

/// Archive stored in HDFS, reached through the namenode's WebHDFS API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhdfsConfig {
    /// Namenode endpoint, e.g. `http://namenode:9870`.
    pub endpoint: String,
    /// Archive root directory in HDFS.
    pub root: String,
}

impl WebhdfsConfig {
    /// Creates a new WebHDFS configuration.
    pub fn new(endpoint: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            root: root.into(),
        }
    }
}
