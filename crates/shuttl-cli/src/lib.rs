#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
mod exit;
pub mod telemetry;

pub use exit::ExitStatus;

/// Tracing target for process startup.
pub const TRACING_TARGET_STARTUP: &str = "shuttl_cli::startup";

/// Tracing target for configuration handling.
pub const TRACING_TARGET_CONFIG: &str = "shuttl_cli::config";
