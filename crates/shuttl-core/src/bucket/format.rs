//! On-disk representations of a bucket.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// The representation a bucket is stored in.
///
/// The string form (`SPLUNK_BUCKET`, `TGZ`, `UNKNOWN`) is also the name of
/// the format root directory in the archive, so it must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum BucketFormat {
    /// The raw bucket directory as produced by the indexer.
    SplunkBucket,
    /// A gzip compressed tarball of the bucket directory.
    Tgz,
    /// Format could not be determined.
    Unknown,
}

impl BucketFormat {
    /// Formats that can be written to the archive.
    pub const ARCHIVABLE: [Self; 2] = [Self::SplunkBucket, Self::Tgz];

    /// Returns true if buckets in this format are directories rather than files.
    pub fn is_directory(self) -> bool {
        matches!(self, Self::SplunkBucket)
    }

    /// File extension used by file based formats.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Tgz => Some("tgz"),
            Self::SplunkBucket | Self::Unknown => None,
        }
    }

    /// Returns true if this format can be written to the archive.
    pub fn is_archivable(self) -> bool {
        Self::ARCHIVABLE.contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_string_form_is_stable() {
        assert_eq!(BucketFormat::SplunkBucket.to_string(), "SPLUNK_BUCKET");
        assert_eq!(BucketFormat::Tgz.as_ref(), "TGZ");
        assert_eq!(
            serde_json::to_string(&BucketFormat::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(BucketFormat::from_str("tgz").unwrap(), BucketFormat::Tgz);
        assert_eq!(
            BucketFormat::from_str("Splunk_Bucket").unwrap(),
            BucketFormat::SplunkBucket
        );
        assert!(BucketFormat::from_str("zip").is_err());
    }

    #[test]
    fn test_unknown_is_not_archivable() {
        assert!(!BucketFormat::Unknown.is_archivable());
        assert!(BucketFormat::Tgz.is_archivable());
        assert_eq!(BucketFormat::Tgz.extension(), Some("tgz"));
        assert!(BucketFormat::SplunkBucket.is_directory());
    }
}
