//! Time range encoded in bucket names.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Span of event time covered by a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketTimeRange {
    /// Timestamp of the oldest event in the bucket.
    pub earliest: Timestamp,
    /// Timestamp of the newest event in the bucket.
    pub latest: Timestamp,
}

impl BucketTimeRange {
    /// Parses the time range out of a bucket name.
    ///
    /// Bucket names look like `db_<latest>_<earliest>_<id>` (or `rb_` for
    /// replicated copies), with both times in epoch seconds. Anything else
    /// has no time range.
    pub fn from_bucket_name(name: &str) -> Option<Self> {
        let mut parts = name.split('_');
        let prefix = parts.next()?;
        if prefix != "db" && prefix != "rb" {
            return None;
        }

        let latest = parts.next()?.parse::<i64>().ok()?;
        let earliest = parts.next()?.parse::<i64>().ok()?;

        Some(Self {
            earliest: Timestamp::from_second(earliest).ok()?,
            latest: Timestamp::from_second(latest).ok()?,
        })
    }

    /// Returns true if this range overlaps `[from, to]`.
    pub fn overlaps(&self, from: Timestamp, to: Timestamp) -> bool {
        self.latest >= from && self.earliest <= to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_name() {
        let range = BucketTimeRange::from_bucket_name("db_1336330530_1336330000_12").unwrap();
        assert_eq!(range.latest.as_second(), 1336330530);
        assert_eq!(range.earliest.as_second(), 1336330000);

        let range = BucketTimeRange::from_bucket_name("db_123_456").unwrap();
        assert_eq!(range.latest.as_second(), 123);
        assert_eq!(range.earliest.as_second(), 456);
    }

    #[test]
    fn test_unparseable_names() {
        assert!(BucketTimeRange::from_bucket_name("hot_v1_3").is_none());
        assert!(BucketTimeRange::from_bucket_name("db_abc_12_0").is_none());
        assert!(BucketTimeRange::from_bucket_name("db_12").is_none());
    }

    #[test]
    fn test_overlaps() {
        let range = BucketTimeRange::from_bucket_name("db_200_100_0").unwrap();
        let at = |s| Timestamp::from_second(s).unwrap();

        assert!(range.overlaps(at(150), at(300)));
        assert!(range.overlaps(at(0), at(100)));
        assert!(!range.overlaps(at(201), at(300)));
        assert!(!range.overlaps(at(0), at(99)));
    }
}
