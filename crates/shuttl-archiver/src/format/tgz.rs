//! Gzip compressed tarballs of bucket directories.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use shuttl_core::bucket::{BucketFormat, LocalBucket};
use shuttl_core::{Error, ErrorKind, Result, fs};
use uuid::Uuid;

use crate::TRACING_TARGET_TRANSFER;

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::new(ErrorKind::Io).with_source(e))?
        .map_err(Error::from)
}

/// Packs `src` into `dst` with every entry below a top-level `root` directory.
fn pack(src: &Path, root: &str, dst: &Path) -> io::Result<u64> {
    let file = File::create(dst)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(root, src)?;

    let mut writer = builder.into_inner()?.finish()?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

/// Converts raw buckets into `<work_dir>/<index>/<bucket>.tgz`.
///
/// The tarball holds the bucket directory itself, so it unpacks into a
/// single `<bucket>/` directory.
#[derive(Debug, Clone)]
pub struct TgzFormatChanger {
    work_dir: PathBuf,
}

impl TgzFormatChanger {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub async fn change_format(&self, bucket: &LocalBucket) -> Result<LocalBucket> {
        if bucket.format() != BucketFormat::SplunkBucket {
            return Err(Error::invalid_input().with_message(format!(
                "cannot create a tgz from bucket {} in format {}",
                bucket.key(),
                bucket.format()
            )));
        }

        let out_dir = self.work_dir.join(bucket.index());
        tokio::fs::create_dir_all(&out_dir).await?;
        let target = out_dir.join(format!("{}.tgz", bucket.name()));
        // Leftover of an interrupted conversion.
        fs::remove_path(&target).await?;

        let src = bucket.path().to_path_buf();
        let root = bucket.name().to_owned();
        let dst = target.clone();
        let size = run_blocking(move || pack(&src, &root, &dst)).await;
        let size = match size {
            Ok(size) => size,
            Err(err) => {
                let _ = fs::remove_path(&target).await;
                return Err(err);
            }
        };

        tracing::debug!(
            target: TRACING_TARGET_TRANSFER,
            index = %bucket.index(),
            bucket = %bucket.name(),
            tgz = %target.display(),
            size,
            "Bucket packed as tgz"
        );

        Ok(LocalBucket::from_parts(bucket.key().clone(), target, BucketFormat::Tgz).with_size(size))
    }
}

/// Unpacks the tgz at `archive` so that the bucket directory ends up at `dest`.
///
/// The archive is unpacked into a hidden sibling of `dest` first and its
/// single top-level directory is renamed into place. Entries escaping the
/// unpack directory are rejected by the tar reader.
pub async fn extract_tgz(archive: &Path, dest: &Path) -> Result<()> {
    if fs::exists(dest).await? {
        return Err(Error::overwrite_denied()
            .with_message(format!("{} already exists", dest.display())));
    }

    let parent = dest.parent().ok_or_else(|| {
        Error::invalid_input().with_message(format!("{} has no parent", dest.display()))
    })?;
    tokio::fs::create_dir_all(parent).await?;
    let unpack_dir = parent.join(format!(".unpack-{}", Uuid::new_v4()));

    let source = archive.to_path_buf();
    let into = unpack_dir.clone();
    let unpacked = run_blocking(move || {
        let file = File::open(&source)?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive.set_preserve_permissions(true);
        archive.unpack(&into)
    })
    .await;

    let result = match unpacked {
        Ok(()) => promote_unpacked(&unpack_dir, dest).await,
        Err(err) => Err(err),
    };
    fs::remove_path(&unpack_dir).await?;
    result
}

async fn promote_unpacked(unpack_dir: &Path, dest: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(unpack_dir).await?;
    let mut top_level = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        top_level.push((entry.path(), entry.file_type().await?.is_dir()));
    }

    match top_level.as_slice() {
        [(single, true)] => tokio::fs::rename(single, dest).await?,
        _ => tokio::fs::rename(unpack_dir, dest).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn raw_bucket(dir: &TempDir) -> LocalBucket {
        let path = dir.path().join("staging/main/db_2_1_0");
        std::fs::create_dir_all(path.join("rawdata")).unwrap();
        std::fs::write(path.join("rawdata/journal.gz"), b"journal").unwrap();
        std::fs::write(path.join("Hosts.data"), b"hosts").unwrap();
        LocalBucket::open("main", &path).await.unwrap()
    }

    #[tokio::test]
    async fn test_tgz_conversion_and_extraction() {
        let dir = TempDir::new().unwrap();
        let bucket = raw_bucket(&dir).await;
        let changer = TgzFormatChanger::new(dir.path().join("work"));

        let tgz = changer.change_format(&bucket).await.unwrap();
        assert_eq!(tgz.format(), BucketFormat::Tgz);
        assert_eq!(tgz.key(), bucket.key());
        assert_eq!(tgz.path(), dir.path().join("work/main/db_2_1_0.tgz"));
        assert!(tgz.size().unwrap() > 0);
        assert!(bucket.path().join("Hosts.data").exists());

        let thawed = dir.path().join("thaw/main/db_2_1_0");
        extract_tgz(tgz.path(), &thawed).await.unwrap();
        assert_eq!(std::fs::read(thawed.join("rawdata/journal.gz")).unwrap(), b"journal");
        assert_eq!(std::fs::read(thawed.join("Hosts.data")).unwrap(), b"hosts");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("thaw/main"))
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1);

        let err = extract_tgz(tgz.path(), &thawed).await.unwrap_err();
        assert!(err.is_overwrite_denied());
    }

    #[tokio::test]
    async fn test_only_raw_buckets_are_packed() {
        let dir = TempDir::new().unwrap();
        let bucket = raw_bucket(&dir).await;
        let changer = TgzFormatChanger::new(dir.path().join("work"));
        let tgz = changer.change_format(&bucket).await.unwrap();

        let err = changer.change_format(&tgz).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
