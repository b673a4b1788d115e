//! Listing archived indexes and buckets.
//!
//! A bucket is archived once per configured format. Listings collapse the
//! copies of a bucket into one entry, picking the format according to the
//! configured priority.

mod buckets;
mod chooser;
mod filter;
mod indexes;
mod resolver;
mod service;

pub use buckets::ArchiveBucketsLister;
pub use chooser::BucketFormatChooser;
pub use filter::BucketFilter;
pub use indexes::ArchivedIndexesLister;
pub use resolver::BucketFormatResolver;
pub use service::{BucketListing, ListingService, default_from, default_to, display_size};
