//! Format changers.
//!
//! Each archive format has one changer turning a staged raw bucket into a
//! local artifact in that format. The input bucket is never modified.

mod tgz;

use std::path::{Path, PathBuf};

use shuttl_core::bucket::{BucketFormat, LocalBucket};
use shuttl_core::{Error, Result, fs};
pub use tgz::{TgzFormatChanger, extract_tgz};

/// Converts buckets into one target format.
#[derive(Debug, Clone)]
pub enum BucketFormatChanger {
    /// Keeps the raw bucket directory.
    SplunkBucket,
    /// Packs the bucket directory into a `.tgz`.
    Tgz(TgzFormatChanger),
}

impl BucketFormatChanger {
    /// Changer for `format`, writing artifacts into `work_dir`.
    pub fn for_format(format: BucketFormat, work_dir: impl Into<PathBuf>) -> Result<Self> {
        match format {
            BucketFormat::SplunkBucket => Ok(Self::SplunkBucket),
            BucketFormat::Tgz => Ok(Self::Tgz(TgzFormatChanger::new(work_dir))),
            BucketFormat::Unknown => Err(Error::invalid_input()
                .with_message("buckets cannot be converted to the UNKNOWN format")),
        }
    }

    /// Changers for every format in `formats`, in order.
    pub fn for_formats(formats: &[BucketFormat], work_dir: &Path) -> Result<Vec<Self>> {
        formats
            .iter()
            .map(|format| Self::for_format(*format, work_dir))
            .collect()
    }

    pub fn target_format(&self) -> BucketFormat {
        match self {
            Self::SplunkBucket => BucketFormat::SplunkBucket,
            Self::Tgz(_) => BucketFormat::Tgz,
        }
    }

    /// Produces `bucket` in the target format.
    pub async fn change_format(&self, bucket: &LocalBucket) -> Result<LocalBucket> {
        match self {
            Self::SplunkBucket => Ok(bucket.clone()),
            Self::Tgz(changer) => changer.change_format(bucket).await,
        }
    }

    /// Removes an artifact produced by [`change_format`](Self::change_format).
    ///
    /// The identity changer produced nothing and removes nothing.
    pub async fn discard(&self, converted: &LocalBucket) -> Result<()> {
        match self {
            Self::SplunkBucket => Ok(()),
            Self::Tgz(_) => Ok(fs::remove_path(converted.path()).await?),
        }
    }
}
