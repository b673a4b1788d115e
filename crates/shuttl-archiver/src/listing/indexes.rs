use std::collections::BTreeSet;
use std::sync::Arc;

use shuttl_core::Result;
use shuttl_core::bucket::BucketFormat;
use shuttl_opendal::ArchiveFileSystem;

use crate::paths::PathResolver;

/// Lists the indexes present in the archive.
#[derive(Clone)]
pub struct ArchivedIndexesLister {
    archive: Arc<dyn ArchiveFileSystem>,
    resolver: PathResolver,
}

impl ArchivedIndexesLister {
    pub fn new(archive: Arc<dyn ArchiveFileSystem>, resolver: PathResolver) -> Self {
        Self { archive, resolver }
    }

    /// Sorted union of the index directories below every format root.
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        let mut indexes = BTreeSet::new();
        for format in BucketFormat::ARCHIVABLE {
            let format_root = self.resolver.format_root(format);
            for path in self.archive.list(&format_root).await? {
                if let Some(name) = path.name() {
                    indexes.insert(name.to_owned());
                }
            }
        }
        Ok(indexes.into_iter().collect())
    }
}
