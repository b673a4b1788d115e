//! Amazon S3 backend.

mod config;

pub use config::S3Config;
