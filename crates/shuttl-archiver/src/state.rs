//! Wiring of the archiver services.

use std::sync::Arc;

use shuttl_core::{ArchiveConfig, Result};
use shuttl_opendal::ArchiveFileSystem;

use crate::freezer::BucketFreezer;
use crate::listing::ListingService;
use crate::locker::{BucketLocker, LockProvider};
use crate::mover::IndexPreservingBucketMover;
use crate::paths::PathResolver;
use crate::receipts::CopyReceipts;
use crate::recovery::FailedBucketsArchiver;
use crate::thaw::{BucketThawer, ThawService};
use crate::transfer::BucketTransferer;

/// All archiver services, sharing one configuration, archive and lock
/// provider.
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ArchiverState {
    pub config: Arc<ArchiveConfig>,
    pub archive: Arc<dyn ArchiveFileSystem>,

    pub freezer: BucketFreezer,
    pub recovery: FailedBucketsArchiver,
    pub listing: ListingService,
    pub thaw: ThawService,
}

impl ArchiverState {
    /// Validates `config` and builds the services on top of `archive`.
    ///
    /// Nothing is created on disk until a service runs.
    pub fn new(
        config: ArchiveConfig,
        archive: Arc<dyn ArchiveFileSystem>,
        locks: Arc<dyn LockProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let paths = PathResolver::new();

        let locker = BucketLocker::new(locks);
        let mover = IndexPreservingBucketMover::from_config(&config);
        let receipts = CopyReceipts::from_config(&config);
        let transferer = Arc::new(BucketTransferer::new(
            config.clone(),
            archive.clone(),
            paths.clone(),
        )?);

        let recovery = FailedBucketsArchiver::new(
            locker.clone(),
            mover.clone(),
            receipts.clone(),
            transferer.clone(),
        );
        let freezer = BucketFreezer::new(locker, mover, receipts, transferer, recovery.clone());
        let listing = ListingService::new(&config, archive.clone(), paths);
        let thaw = ThawService::new(
            listing.clone(),
            BucketThawer::from_config(&config, archive.clone()),
        );

        Ok(Self {
            config,
            archive,
            freezer,
            recovery,
            listing,
            thaw,
        })
    }
}

impl std::fmt::Debug for ArchiverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiverState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
