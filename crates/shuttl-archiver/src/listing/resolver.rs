use std::collections::BTreeMap;

use shuttl_core::bucket::{Bucket, BucketFormat, BucketKey};

use super::BucketFormatChooser;

/// Collapses the per-format entries of each bucket into one entry.
#[derive(Debug, Clone)]
pub struct BucketFormatResolver {
    chooser: BucketFormatChooser,
}

impl BucketFormatResolver {
    pub fn new(chooser: BucketFormatChooser) -> Self {
        Self { chooser }
    }

    /// One bucket per identity, in the format picked by the chooser.
    ///
    /// When nothing usable was picked the entry is reported as `UNKNOWN`
    /// rather than dropped. Output is ordered by identity.
    pub fn resolve_buckets_with_formats(&self, buckets: Vec<Bucket>) -> Vec<Bucket> {
        let mut grouped: BTreeMap<BucketKey, Vec<Bucket>> = BTreeMap::new();
        for bucket in buckets {
            grouped.entry(bucket.key().clone()).or_default().push(bucket);
        }

        grouped
            .into_values()
            .filter_map(|group| {
                let formats: Vec<_> = group.iter().map(Bucket::format).collect();
                let chosen = self.chooser.choose_format(&formats);
                let mut group = group.into_iter();

                let first = group.next()?;
                if first.format() == chosen {
                    return Some(first);
                }
                match group.find(|bucket| bucket.format() == chosen) {
                    Some(bucket) => Some(bucket),
                    None => Some(
                        first
                            .converted(BucketFormat::Unknown, first.location().clone())
                            .with_size(first.size()),
                    ),
                }
            })
            .collect()
    }
}
