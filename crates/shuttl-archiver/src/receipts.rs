//! Copy receipts.
//!
//! A receipt is an empty marker file stating that every configured format
//! of a bucket reached the archive. A staged bucket without a receipt is
//! pending work for the recovery pass.

use std::path::PathBuf;

use shuttl_core::bucket::BucketKey;
use shuttl_core::{ArchiveConfig, Result, fs};

use crate::TRACING_TARGET_TRANSFER;

/// File name of the marker inside a bucket's receipt directory.
pub const RECEIPT_FILE_NAME: &str = "copy-receipt.file";

/// Receipts stored under `<receipts_root>/<index>/<bucket>/`.
#[derive(Debug, Clone)]
pub struct CopyReceipts {
    receipts_root: PathBuf,
}

impl CopyReceipts {
    pub fn new(receipts_root: impl Into<PathBuf>) -> Self {
        Self {
            receipts_root: receipts_root.into(),
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.receipts_dir())
    }

    fn receipt_dir(&self, key: &BucketKey) -> PathBuf {
        self.receipts_root.join(key.index()).join(key.name())
    }

    /// Location of the receipt for `key`.
    pub fn receipt_path(&self, key: &BucketKey) -> PathBuf {
        self.receipt_dir(key).join(RECEIPT_FILE_NAME)
    }

    pub async fn create_receipt(&self, key: &BucketKey) -> Result<()> {
        let path = self.receipt_path(key);
        fs::touch(&path).await?;

        tracing::debug!(
            target: TRACING_TARGET_TRANSFER,
            index = %key.index(),
            bucket = %key.name(),
            receipt = %path.display(),
            "Copy receipt created"
        );
        Ok(())
    }

    pub async fn has_receipt(&self, key: &BucketKey) -> Result<bool> {
        Ok(fs::exists(self.receipt_path(key)).await?)
    }

    /// Removes the receipt of `key`, if any.
    pub async fn remove_receipt(&self, key: &BucketKey) -> Result<()> {
        fs::remove_path(self.receipt_dir(key)).await?;
        Ok(())
    }
}
