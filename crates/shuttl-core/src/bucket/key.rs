//! Bucket identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the metadata object stored next to archived bucket data. No
/// bucket may carry this name.
pub const METADATA_FILE_NAME: &str = "bucket.json";

/// Identity of a bucket: the index it belongs to and its name.
///
/// Locks, receipts and format grouping are all keyed by this value. Both
/// parts are validated path segments, so `(index, name)` maps to a unique
/// location in every layout derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub struct BucketKey {
    index: String,
    name: String,
}

impl BucketKey {
    /// Creates a new bucket key, validating both segments.
    pub fn new(index: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let index = index.into();
        let name = name.into();
        validate_segment("index", &index)?;
        validate_segment("bucket name", &name)?;
        if name == METADATA_FILE_NAME {
            return Err(Error::invalid_input()
                .with_message(format!("bucket name '{name}' is reserved for metadata")));
        }
        Ok(Self { index, name })
    }

    /// Name of the index the bucket belongs to.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Name of the bucket.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.name)
    }
}

/// Checks that `value` can be used as a single path segment.
///
/// Rejects empty values, `.` and `..`, and anything containing a path
/// separator or a NUL byte.
pub fn validate_segment(what: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);

    if invalid {
        return Err(Error::invalid_input().with_message(format!(
            "{what} '{value}' is not a valid path segment"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key() {
        let key = BucketKey::new("main", "db_1336330530_1336330000_0").unwrap();
        assert_eq!(key.index(), "main");
        assert_eq!(key.to_string(), "main/db_1336330530_1336330000_0");
    }

    #[test]
    fn test_invalid_segments_are_rejected() {
        assert!(BucketKey::new("", "db_1_2_0").is_err());
        assert!(BucketKey::new("main", "..").is_err());
        assert!(BucketKey::new("ma/in", "db").is_err());
        assert!(BucketKey::new("main", METADATA_FILE_NAME).is_err());
        assert!(BucketKey::new(METADATA_FILE_NAME, "db").is_ok());
        assert!(BucketKey::new("main", "db\\x").is_err());
    }
}
