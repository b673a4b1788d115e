use shuttl_core::bucket::BucketFormat;

/// Picks one format out of those a bucket is archived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFormatChooser {
    priority: Vec<BucketFormat>,
}

impl BucketFormatChooser {
    /// Chooser preferring formats in the order of `priority`.
    pub fn new(priority: Vec<BucketFormat>) -> Self {
        Self { priority }
    }

    /// The highest priority format in `available`.
    ///
    /// Without a preferred format present, falls back to the first present
    /// archivable format, and to `UNKNOWN` if there is none. Never fails.
    pub fn choose_format(&self, available: &[BucketFormat]) -> BucketFormat {
        self.priority
            .iter()
            .chain(BucketFormat::ARCHIVABLE.iter())
            .find(|format| available.contains(format))
            .copied()
            .unwrap_or(BucketFormat::Unknown)
    }
}
