//! Local filesystem backend.

mod config;

pub use config::FsConfig;
