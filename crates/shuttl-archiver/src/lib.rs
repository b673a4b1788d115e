#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod format;
pub mod freezer;
pub mod listing;
pub mod locker;
pub mod metadata;
pub mod mover;
pub mod paths;
pub mod receipts;
pub mod recovery;
mod state;
pub mod thaw;
pub mod transfer;

#[doc(hidden)]
pub mod prelude;

pub use state::ArchiverState;

/// Tracing target for bucket lock operations.
pub const TRACING_TARGET_LOCK: &str = "shuttl_archiver::lock";

/// Tracing target for the freeze workflow.
pub const TRACING_TARGET_FREEZE: &str = "shuttl_archiver::freeze";

/// Tracing target for format changes and archive transfers.
pub const TRACING_TARGET_TRANSFER: &str = "shuttl_archiver::transfer";

/// Tracing target for recovery passes.
pub const TRACING_TARGET_RECOVERY: &str = "shuttl_archiver::recovery";

/// Tracing target for archive listings.
pub const TRACING_TARGET_LISTING: &str = "shuttl_archiver::listing";

/// Tracing target for thawing.
pub const TRACING_TARGET_THAW: &str = "shuttl_archiver::thaw";
