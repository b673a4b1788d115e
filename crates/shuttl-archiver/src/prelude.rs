//! Convenient re-exports for common use.

pub use crate::ArchiverState;
pub use crate::freezer::{BucketFreezer, FreezeOutcome};
pub use crate::listing::{BucketListing, ListingService};
pub use crate::locker::{BucketLocker, FileLeaseProvider, LockProvider, MemoryLockProvider};
pub use crate::recovery::{FailedBucketsArchiver, RecoveryReport};
pub use crate::thaw::{ThawReport, ThawService};
