//! Local filesystem helpers.

use std::io;
use std::path::{Path, PathBuf};

/// Total size in bytes of all regular files below `path`.
///
/// Symbolic links are not followed. A regular file yields its own size.
pub async fn directory_size(path: impl AsRef<Path>) -> io::Result<u64> {
    let path = path.as_ref();
    let metadata = tokio::fs::symlink_metadata(path).await?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }

    let mut total = 0;
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                total += entry.metadata().await?.len();
            }
        }
    }

    Ok(total)
}

/// Recursively copies the directory `src` to `dst`.
///
/// `dst` must not exist yet.
pub async fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    let mut pending: Vec<(PathBuf, PathBuf)> =
        vec![(src.as_ref().to_path_buf(), dst.as_ref().to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), target).await?;
            }
        }
    }

    Ok(())
}

/// Removes a file or a directory tree. A missing path is not an error.
pub async fn remove_path(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(err) => Err(err),
    };

    match result {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Creates an empty file, creating parent directories as needed.
pub async fn touch(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .await?;
    Ok(())
}

/// Returns true if something exists at `path`.
pub async fn exists(path: impl AsRef<Path>) -> io::Result<bool> {
    tokio::fs::try_exists(path).await
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_copy_and_size() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a"), b"abc").unwrap();
        std::fs::write(src.join("nested/b"), b"defg").unwrap();

        assert_eq!(directory_size(&src).await.unwrap(), 7);

        let dst = temp.path().join("dst");
        copy_dir_all(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(dst.join("nested/b")).unwrap(), b"defg");
        assert_eq!(directory_size(&dst).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_remove_and_touch() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("x/y/marker");

        touch(&marker).await.unwrap();
        assert!(exists(&marker).await.unwrap());
        assert_eq!(std::fs::metadata(&marker).unwrap().len(), 0);

        remove_path(temp.path().join("x")).await.unwrap();
        assert!(!exists(&marker).await.unwrap());
        remove_path(temp.path().join("x")).await.unwrap();
    }
}
