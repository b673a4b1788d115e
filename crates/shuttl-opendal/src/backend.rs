//! Archive file system backed by an OpenDAL operator.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use futures::TryStreamExt;
use opendal::{Capability, Operator, services};
use shuttl_core::bucket::{BucketFormat, validate_segment};
use shuttl_core::path::RemotePath;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::TRACING_TARGET;
use crate::archive_fs::ArchiveFileSystem;
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

/// Directory below the archive root used for in-flight uploads.
const DEFAULT_TMP_DIR: &str = "_tmp";

/// Directory below the tmp root holding write claims on remote paths.
const CLAIMS_DIR: &str = ".claims";

/// Size of the chunks local files are uploaded in.
const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// What a remote path currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteKind {
    File,
    Dir,
    Missing,
}

/// [`ArchiveFileSystem`] over any OpenDAL operator.
///
/// Remote paths are written at most once. On the local filesystem the final
/// step of every write is a hard link, a no-replace rename or an exclusive
/// create, so of two racing writers exactly one succeeds. Other backends
/// take an exclusive claim with a conditional write first, where the
/// backend supports one.
#[derive(Clone)]
pub struct OpendalArchive {
    operator: Operator,
    config: StorageConfig,
    tmp_root: RemotePath,
    local_root: Option<PathBuf>,
}

impl OpendalArchive {
    /// Creates a new archive from configuration.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let operator = Self::create_operator(&config)?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = config.backend_name(),
            root = %config.root(),
            "Archive file system initialized"
        );

        Ok(Self {
            operator,
            local_root: config.local_root().map(Path::to_path_buf),
            config,
            tmp_root: RemotePath::new(DEFAULT_TMP_DIR),
        })
    }

    /// Uses `name` instead of `_tmp` as the directory for in-flight uploads.
    ///
    /// The name must be a single path segment and must not collide with a
    /// bucket format root.
    pub fn with_tmp_dir(mut self, name: &str) -> StorageResult<Self> {
        validate_segment("archive tmp directory", name)
            .map_err(|e| StorageError::init(e.to_string()))?;

        if BucketFormat::from_str(name).is_ok() {
            return Err(StorageError::init(format!(
                "archive tmp directory '{name}' collides with a format root"
            )));
        }

        self.tmp_root = RemotePath::new(name);
        Ok(self)
    }

    /// Returns the configuration for this archive.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the underlying operator.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Directory used for in-flight uploads.
    pub fn tmp_root(&self) -> &RemotePath {
        &self.tmp_root
    }

    fn capability(&self) -> Capability {
        self.operator.info().full_capability()
    }

    async fn kind_of(&self, remote: &RemotePath) -> StorageResult<RemoteKind> {
        if !remote.is_root() {
            match self.operator.stat(remote.as_file()).await {
                Ok(meta) if meta.is_dir() => return Ok(RemoteKind::Dir),
                Ok(_) => return Ok(RemoteKind::File),
                Err(e) if e.kind() == opendal::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let dir = remote.as_dir();
        match self.operator.stat(&dir).await {
            Ok(_) => return Ok(RemoteKind::Dir),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Object stores may hold a prefix without a directory marker.
        if self.children(remote).await?.is_empty() {
            Ok(RemoteKind::Missing)
        } else {
            Ok(RemoteKind::Dir)
        }
    }

    async fn children(&self, remote: &RemotePath) -> StorageResult<Vec<RemotePath>> {
        let entries = match self.operator.list(&remote.as_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut children: Vec<_> = entries
            .into_iter()
            .map(|entry| RemotePath::new(entry.path()))
            .filter(|path| path != remote)
            .collect();
        children.sort();
        children.dedup();
        Ok(children)
    }

    async fn ensure_local_source(local: &Path) -> StorageResult<()> {
        if !tokio::fs::try_exists(local).await? {
            return Err(StorageError::not_found(local.display().to_string()));
        }
        Ok(())
    }

    async fn ensure_vacant(&self, remote: &RemotePath) -> StorageResult<()> {
        if self.kind_of(remote).await? != RemoteKind::Missing {
            return Err(StorageError::already_exists(remote.to_string()));
        }
        Ok(())
    }

    fn claim_path(&self, remote: &RemotePath) -> RemotePath {
        self.tmp_root.join(CLAIMS_DIR).join(remote.as_file())
    }

    /// Takes the single-writer claim on `remote` of a backend without a
    /// local root.
    ///
    /// Backends lacking conditional writes only get the vacancy check done
    /// by the caller.
    async fn claim(&self, remote: &RemotePath) -> StorageResult<()> {
        if !self.capability().write_with_if_not_exists {
            return Ok(());
        }

        let claim = self.claim_path(remote);
        let written = self
            .operator
            .write_with(claim.as_file(), Uuid::new_v4().to_string().into_bytes())
            .if_not_exists(true)
            .await;

        match written {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == opendal::ErrorKind::ConditionNotMatch => {
                Err(StorageError::already_exists(remote.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drops the claims on `remote` and everything below it.
    async fn release_claims(&self, remote: &RemotePath) -> StorageResult<()> {
        if self.local_root.is_some() || !self.capability().write_with_if_not_exists {
            return Ok(());
        }

        let claim = self.claim_path(remote);
        for result in [
            self.operator.delete(claim.as_file()).await,
            self.operator.remove_all(&claim.as_dir()).await,
        ] {
            if let Err(e) = result
                && e.kind() != opendal::ErrorKind::NotFound
            {
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Creates the local entry `remote` for a non-atomic upload of `source`,
    /// failing if anything is already there.
    async fn reserve(&self, source: &Path, remote: &RemotePath) -> StorageResult<()> {
        let Some(root) = &self.local_root else {
            return self.claim(remote).await;
        };

        let target = root.join(remote.as_file());
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let created = if tokio::fs::metadata(source).await?.is_dir() {
            tokio::fs::create_dir(&target).await
        } else {
            tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
                .map(drop)
        };
        created.map_err(|err| occupied(err, remote))
    }

    /// Moves `from` to `to` below the local root without ever replacing
    /// what is at `to`.
    ///
    /// Files are published with a hard link, which fails on an existing
    /// target. Directories are renamed, which fails on an existing file or
    /// non-empty directory; an empty source directory is recreated
    /// exclusively instead.
    async fn rename_local(root: &Path, from: &RemotePath, to: &RemotePath) -> StorageResult<()> {
        let source = root.join(from.as_file());
        let target = root.join(to.as_file());
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if !tokio::fs::metadata(&source).await?.is_dir() {
            tokio::fs::hard_link(&source, &target)
                .await
                .map_err(|err| occupied(err, to))?;
            tokio::fs::remove_file(&source).await?;
            return Ok(());
        }

        let mut entries = tokio::fs::read_dir(&source).await?;
        if entries.next_entry().await?.is_none() {
            tokio::fs::create_dir(&target)
                .await
                .map_err(|err| occupied(err, to))?;
            tokio::fs::remove_dir(&source).await?;
            return Ok(());
        }

        tokio::fs::rename(&source, &target)
            .await
            .map_err(|err| occupied(err, to))
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> StorageResult<()> {
        let mut file = tokio::fs::File::open(local).await?;
        let mut writer = self.operator.writer(remote).await?;

        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
        loop {
            let read = match file.read(&mut buf).await {
                Ok(read) => read,
                Err(err) => {
                    let _ = writer.abort().await;
                    return Err(err.into());
                }
            };
            if read == 0 {
                break;
            }
            if let Err(err) = writer.write(buf[..read].to_vec()).await {
                let _ = writer.abort().await;
                return Err(err.into());
            }
        }

        writer.close().await?;
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &RemotePath) -> StorageResult<()> {
        let metadata = tokio::fs::metadata(local).await?;
        if !metadata.is_dir() {
            return self.upload_file(local, remote.as_file()).await;
        }

        let create_dirs = self.capability().create_dir;
        let mut pending = vec![(local.to_path_buf(), remote.clone())];
        while let Some((dir, target)) = pending.pop() {
            if create_dirs {
                self.operator.create_dir(&target.as_dir()).await?;
            }

            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let child = target.join(entry.file_name().to_string_lossy());
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), child));
                } else {
                    self.upload_file(&entry.path(), child.as_file()).await?;
                }
            }
        }

        Ok(())
    }

    async fn download_file(&self, remote: &str, local: &Path) -> StorageResult<()> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let reader = self.operator.reader(remote).await?;
        let stream = reader.into_bytes_stream(..).await?;
        let mut stream = std::pin::pin!(stream);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(local)
            .await?;

        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn download(&self, remote: &RemotePath, local: &Path) -> StorageResult<()> {
        match self.kind_of(remote).await? {
            RemoteKind::Missing => Err(StorageError::not_found(remote.to_string())),
            RemoteKind::File => self.download_file(remote.as_file(), local).await,
            RemoteKind::Dir => {
                tokio::fs::create_dir_all(local).await?;
                let entries = self
                    .operator
                    .list_with(&remote.as_dir())
                    .recursive(true)
                    .await?;

                for entry in entries {
                    let path = RemotePath::new(entry.path());
                    let Some(relative) = path.strip_prefix(remote) else {
                        continue;
                    };
                    if relative.is_empty() {
                        continue;
                    }

                    let target = local.join(relative);
                    if entry.metadata().is_dir() {
                        tokio::fs::create_dir_all(&target).await?;
                    } else {
                        self.download_file(path.as_file(), &target).await?;
                    }
                }
                Ok(())
            }
        }
    }

    async fn delete_tree(&self, remote: &RemotePath) -> StorageResult<()> {
        if remote.is_root() {
            return Err(StorageError::invalid_path("refusing to delete the archive root"));
        }

        let result = match self.kind_of(remote).await? {
            RemoteKind::Missing => Ok(()),
            RemoteKind::File => self.operator.delete(remote.as_file()).await,
            RemoteKind::Dir => {
                let dir = remote.as_dir();
                match self.operator.remove_all(&dir).await {
                    Ok(()) => self.operator.delete(&dir).await,
                    Err(e) => Err(e),
                }
            }
        };

        if let Err(e) = result
            && e.kind() != opendal::ErrorKind::NotFound
        {
            return Err(e.into());
        }
        self.release_claims(remote).await
    }

    async fn relocate(&self, from: &RemotePath, to: &RemotePath) -> StorageResult<()> {
        let kind = self.kind_of(from).await?;
        if kind == RemoteKind::Missing {
            return Err(StorageError::not_found(from.to_string()));
        }
        self.ensure_vacant(to).await?;

        if let Some(root) = &self.local_root {
            return Self::rename_local(root, from, to).await;
        }

        self.claim(to).await?;
        if let Err(err) = self.relocate_claimed(kind, from, to).await {
            // The claim is ours, so whatever landed at `to` is ours as well.
            if let Err(cleanup) = self.delete_tree(to).await {
                tracing::warn!(
                    target: TRACING_TARGET,
                    remote = %to,
                    error = %cleanup,
                    "Failed to clean up partial move"
                );
            }
            return Err(err);
        }

        self.delete_tree(from).await
    }

    async fn relocate_claimed(
        &self,
        kind: RemoteKind,
        from: &RemotePath,
        to: &RemotePath,
    ) -> StorageResult<()> {
        let capability = self.capability();
        if capability.rename {
            self.operator.rename(from.as_file(), to.as_file()).await?;
            return Ok(());
        }

        // Without rename the promotion is a copy per object.
        if kind == RemoteKind::File {
            self.operator.copy(from.as_file(), to.as_file()).await?;
            return Ok(());
        }

        let entries = self
            .operator
            .list_with(&from.as_dir())
            .recursive(true)
            .await?;

        for entry in entries {
            let path = RemotePath::new(entry.path());
            let Some(relative) = path.strip_prefix(from) else {
                continue;
            };
            let target = to.join(relative);
            if entry.metadata().is_dir() {
                if capability.create_dir {
                    self.operator.create_dir(&target.as_dir()).await?;
                }
            } else {
                self.operator.copy(path.as_file(), target.as_file()).await?;
            }
        }
        Ok(())
    }

    /// Runs `upload` into a fresh directory under the tmp root and moves
    /// the result to `remote`. The tmp directory is always cleaned up.
    async fn promote<F, Fut>(&self, remote: &RemotePath, upload: F) -> StorageResult<()>
    where
        F: FnOnce(RemotePath) -> Fut,
        Fut: Future<Output = StorageResult<()>>,
    {
        let name = remote
            .name()
            .ok_or_else(|| StorageError::invalid_path("cannot write the archive root"))?;
        let staging = self.tmp_root.join(Uuid::new_v4().to_string());
        let temp = staging.join(name);

        let result = match upload(temp.clone()).await {
            Ok(()) => self.relocate(&temp, remote).await,
            Err(err) => Err(err),
        };

        if let Err(err) = self.delete_tree(&staging).await {
            tracing::warn!(
                target: TRACING_TARGET,
                tmp = %staging,
                error = %err,
                "Failed to clean up tmp upload"
            );
        }

        result
    }

    /// Creates an OpenDAL operator based on configuration.
    #[allow(unreachable_patterns)]
    fn create_operator(config: &StorageConfig) -> StorageResult<Operator> {
        match config {
            StorageConfig::Fs(fs) => {
                let root = fs.root.to_str().ok_or_else(|| {
                    StorageError::init(format!("archive root {} is not UTF-8", fs.root.display()))
                })?;
                let builder = services::Fs::default().root(root);

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(feature = "s3")]
            StorageConfig::S3(s3) => {
                let mut builder = services::S3::default()
                    .bucket(&s3.bucket)
                    .region(&s3.region);

                if let Some(ref prefix) = s3.prefix {
                    builder = builder.root(prefix);
                }

                if let Some(ref endpoint) = s3.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(feature = "webhdfs")]
            StorageConfig::Webhdfs(hdfs) => {
                let builder = services::Webhdfs::default()
                    .endpoint(&hdfs.endpoint)
                    .root(&hdfs.root);

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            // Reached when the backend's cargo feature is disabled
            _ => Err(StorageError::init(format!(
                "backend {} is not supported with current features",
                config.backend_name()
            ))),
        }
    }
}

/// Maps the local error of an exclusive create, link or rename to
/// `AlreadyExists` when something occupies `remote`.
fn occupied(err: io::Error, remote: &RemotePath) -> StorageError {
    match err.kind() {
        io::ErrorKind::AlreadyExists
        | io::ErrorKind::DirectoryNotEmpty
        | io::ErrorKind::NotADirectory
        | io::ErrorKind::IsADirectory => StorageError::already_exists(remote.to_string()),
        _ => err.into(),
    }
}

#[async_trait]
impl ArchiveFileSystem for OpendalArchive {
    async fn get(&self, remote: &RemotePath, local: &Path) -> shuttl_core::Result<()> {
        tracing::debug!(target: TRACING_TARGET, remote = %remote, local = %local.display(), "Getting");

        if tokio::fs::try_exists(local).await? {
            return Err(StorageError::already_exists(local.display().to_string()).into());
        }

        if let Err(err) = self.download(remote, local).await {
            if !err.is_not_found() {
                let _ = shuttl_core::fs::remove_path(local).await;
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn put(&self, local: &Path, remote: &RemotePath) -> shuttl_core::Result<()> {
        tracing::debug!(target: TRACING_TARGET, local = %local.display(), remote = %remote, "Putting");

        Self::ensure_local_source(local).await?;
        self.ensure_vacant(remote).await?;
        self.reserve(local, remote).await?;
        self.upload(local, remote).await?;
        Ok(())
    }

    async fn put_atomically(&self, local: &Path, remote: &RemotePath) -> shuttl_core::Result<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            local = %local.display(),
            remote = %remote,
            "Putting atomically"
        );

        Self::ensure_local_source(local).await?;
        self.ensure_vacant(remote).await?;
        self.promote(remote, |temp| async move { self.upload(local, &temp).await })
            .await?;
        Ok(())
    }

    async fn put_bytes(&self, bytes: Vec<u8>, remote: &RemotePath) -> shuttl_core::Result<()> {
        tracing::debug!(target: TRACING_TARGET, remote = %remote, size = bytes.len(), "Writing object");

        self.ensure_vacant(remote).await?;
        self.promote(remote, |temp| async move {
            self.operator.write(temp.as_file(), bytes).await?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn list(&self, remote: &RemotePath) -> shuttl_core::Result<Vec<RemotePath>> {
        let paths = match self.kind_of(remote).await? {
            RemoteKind::Missing => Vec::new(),
            RemoteKind::File => vec![remote.clone()],
            RemoteKind::Dir => self.children(remote).await?,
        };
        Ok(paths)
    }

    async fn delete_recursively(&self, remote: &RemotePath) -> shuttl_core::Result<()> {
        tracing::debug!(target: TRACING_TARGET, remote = %remote, "Deleting recursively");

        self.delete_tree(remote).await?;
        Ok(())
    }

    async fn move_path(&self, from: &RemotePath, to: &RemotePath) -> shuttl_core::Result<()> {
        tracing::debug!(target: TRACING_TARGET, from = %from, to = %to, "Moving");

        self.relocate(from, to).await?;
        Ok(())
    }

    async fn exists(&self, remote: &RemotePath) -> shuttl_core::Result<bool> {
        Ok(self.kind_of(remote).await? != RemoteKind::Missing)
    }

    async fn read(&self, remote: &RemotePath) -> shuttl_core::Result<Vec<u8>> {
        let buffer = self
            .operator
            .read(remote.as_file())
            .await
            .map_err(StorageError::from)?;
        Ok(buffer.to_vec())
    }
}

impl std::fmt::Debug for OpendalArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpendalArchive")
            .field("backend", &self.config.backend_name())
            .field("root", &self.config.root())
            .field("tmp_root", &self.tmp_root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use shuttl_core::ErrorKind;
    use tempfile::TempDir;

    use super::*;
    use crate::config::FsConfig;

    struct Fixture {
        local: TempDir,
        _remote: TempDir,
        archive: OpendalArchive,
    }

    impl Fixture {
        fn new() -> Self {
            let local = TempDir::new().unwrap();
            let remote = TempDir::new().unwrap();
            let archive =
                OpendalArchive::new(StorageConfig::Fs(FsConfig::new(remote.path()))).unwrap();
            Self {
                local,
                _remote: remote,
                archive,
            }
        }

        fn file(&self, name: &str, content: &[u8]) -> std::path::PathBuf {
            let path = self.local.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let fx = Fixture::new();
        let first = fx.file("first", b"first");
        let second = fx.file("second", b"second");
        let remote = RemotePath::new("TGZ/main/db_2_1_0/db_2_1_0.tgz");

        fx.archive.put(&first, &remote).await.unwrap();
        let err = fx.archive.put(&second, &remote).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverwriteDenied);

        let err = fx.archive.put_atomically(&second, &remote).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverwriteDenied);

        assert_eq!(fx.archive.read(&remote).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_put_missing_local_file() {
        let fx = Fixture::new();
        let err = fx
            .archive
            .put(&fx.local.path().join("missing"), &RemotePath::new("a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!fx.archive.exists(&RemotePath::new("a")).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_atomically_directory() {
        let fx = Fixture::new();
        fx.file("bucket/rawdata/journal.gz", b"journal");
        fx.file("bucket/Hosts.data", b"hosts");
        let remote = RemotePath::new("SPLUNK_BUCKET/main/bucket/bucket");

        fx.archive
            .put_atomically(&fx.local.path().join("bucket"), &remote)
            .await
            .unwrap();

        let children = fx.archive.list(&remote).await.unwrap();
        assert_eq!(
            children,
            vec![remote.join("Hosts.data"), remote.join("rawdata")]
        );
        assert_eq!(
            fx.archive.read(&remote.join("rawdata/journal.gz")).await.unwrap(),
            b"journal"
        );

        let leftovers = fx.archive.list(fx.archive.tmp_root()).await.unwrap();
        assert!(leftovers.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_puts_write_once() {
        let fx = Fixture::new();
        let first = fx.file("first", b"first");
        let second = fx.file("second", b"second");

        for round in 0..50 {
            let remote = RemotePath::new(format!("TGZ/main/db_{round}/db_{round}.tgz"));
            let contents = [
                (first.clone(), b"first".as_slice()),
                (second.clone(), b"second".as_slice()),
            ];
            let tasks = contents.map(|(local, content)| {
                let archive = fx.archive.clone();
                let remote = remote.clone();
                tokio::spawn(async move { (archive.put_atomically(&local, &remote).await, content) })
            });

            let mut written = Vec::new();
            for task in tasks {
                match task.await.unwrap() {
                    (Ok(()), content) => written.push(content),
                    (Err(err), _) => assert_eq!(err.kind(), ErrorKind::OverwriteDenied),
                }
            }

            assert_eq!(written.len(), 1, "round {round}");
            assert_eq!(fx.archive.read(&remote).await.unwrap(), written[0]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_directory_puts_write_once() {
        let fx = Fixture::new();
        fx.file("one/rawdata", b"one");
        fx.file("two/rawdata", b"two");
        let remote = RemotePath::new("SPLUNK_BUCKET/main/db_2_1_0/db_2_1_0");

        let tasks = ["one", "two"].map(|name| {
            let archive = fx.archive.clone();
            let local = fx.local.path().join(name);
            let remote = remote.clone();
            tokio::spawn(async move { archive.put_atomically(&local, &remote).await })
        });

        let mut succeeded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => succeeded += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::OverwriteDenied),
            }
        }
        assert_eq!(succeeded, 1);
        assert_eq!(fx.archive.list(&remote).await.unwrap(), vec![remote.join("rawdata")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_put_atomically_leaves_nothing() {
        let fx = Fixture::new();
        fx.file("bucket/rawdata/journal.gz", b"journal");
        fx.file("bucket/Hosts.data", b"hosts");
        std::os::unix::fs::symlink(
            fx.local.path().join("gone"),
            fx.local.path().join("bucket/Strings.data"),
        )
        .unwrap();
        let remote = RemotePath::new("SPLUNK_BUCKET/main/bucket/bucket");

        let result = fx
            .archive
            .put_atomically(&fx.local.path().join("bucket"), &remote)
            .await;

        assert!(result.is_err());
        assert!(!fx.archive.exists(&remote).await.unwrap());
        assert!(fx.archive.list(&remote.parent().unwrap()).await.unwrap().is_empty());
        let leftovers = fx.archive.list(fx.archive.tmp_root()).await.unwrap();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_put_reserves_its_target() {
        let fx = Fixture::new();
        fx.file("tree/a/b", b"b");
        let file = fx.file("f", b"f");
        let remote = RemotePath::new("tree");

        fx.archive
            .put(&fx.local.path().join("tree"), &remote)
            .await
            .unwrap();
        let err = fx.archive.put(&file, &remote).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverwriteDenied);

        let err = fx
            .archive
            .put(&fx.local.path().join("tree"), &remote.join("a/b"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverwriteDenied);
        assert_eq!(fx.archive.read(&remote.join("a/b")).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_list_semantics() {
        let fx = Fixture::new();
        let file = fx.file("f", b"x");
        let remote = RemotePath::new("dir/f");
        fx.archive.put(&file, &remote).await.unwrap();

        assert!(fx.archive.list(&RemotePath::new("nope")).await.unwrap().is_empty());
        assert_eq!(fx.archive.list(&remote).await.unwrap(), vec![remote.clone()]);
        assert_eq!(
            fx.archive.list(&RemotePath::new("dir")).await.unwrap(),
            vec![remote]
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let fx = Fixture::new();
        fx.file("tree/a/b", b"b");
        let remote = RemotePath::new("tree");
        fx.archive
            .put(&fx.local.path().join("tree"), &remote)
            .await
            .unwrap();

        fx.archive.delete_recursively(&remote).await.unwrap();
        assert!(!fx.archive.exists(&remote).await.unwrap());
        fx.archive.delete_recursively(&remote).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_semantics() {
        let fx = Fixture::new();
        fx.file("tree/a/b", b"b");
        let remote = RemotePath::new("tree");
        fx.archive
            .put(&fx.local.path().join("tree"), &remote)
            .await
            .unwrap();

        let err = fx
            .archive
            .get(&RemotePath::new("missing"), &fx.local.path().join("out"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = fx
            .archive
            .get(&remote, &fx.local.path().join("tree"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverwriteDenied);

        let out = fx.local.path().join("restored");
        fx.archive.get(&remote, &out).await.unwrap();
        assert_eq!(std::fs::read(out.join("a/b")).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_move_denies_overwrite() {
        let fx = Fixture::new();
        let a = RemotePath::new("a");
        let b = RemotePath::new("b");
        fx.archive.put_bytes(b"a".to_vec(), &a).await.unwrap();
        fx.archive.put_bytes(b"b".to_vec(), &b).await.unwrap();

        let err = fx.archive.move_path(&a, &b).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverwriteDenied);
        assert_eq!(fx.archive.read(&b).await.unwrap(), b"b");

        let c = RemotePath::new("nested/c");
        fx.archive.move_path(&a, &c).await.unwrap();
        assert!(!fx.archive.exists(&a).await.unwrap());
        assert_eq!(fx.archive.read(&c).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_tmp_dir_must_not_be_a_format_root() {
        let remote = TempDir::new().unwrap();
        let archive =
            OpendalArchive::new(StorageConfig::Fs(FsConfig::new(remote.path()))).unwrap();
        assert!(archive.clone().with_tmp_dir("TGZ").is_err());
        assert!(archive.clone().with_tmp_dir("a/b").is_err());
        assert_eq!(
            archive.with_tmp_dir(".incoming").unwrap().tmp_root(),
            &RemotePath::new(".incoming")
        );
    }
}
