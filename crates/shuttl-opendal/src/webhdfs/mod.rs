//! Hadoop WebHDFS backend.

mod config;

pub use config::WebhdfsConfig;
