use jiff::Timestamp;
use shuttl_core::bucket::Bucket;

/// Filters listed buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketFilter;

impl BucketFilter {
    pub fn new() -> Self {
        Self
    }

    /// Keeps buckets whose time range overlaps `[from, to]`.
    ///
    /// Buckets whose name carries no time range are kept.
    pub fn filter_by_time_range(
        &self,
        buckets: Vec<Bucket>,
        from: Timestamp,
        to: Timestamp,
    ) -> Vec<Bucket> {
        buckets
            .into_iter()
            .filter(|bucket| {
                bucket
                    .time_range()
                    .is_none_or(|range| range.overlaps(from, to))
            })
            .collect()
    }
}
