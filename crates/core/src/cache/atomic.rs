//! Whole-file replacement via temp file and rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Error;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Extension carried by in-flight temporary files.
pub(crate) const TMP_EXTENSION: &str = "tmp";

fn tmp_path(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("{}.{n}.{TMP_EXTENSION}", std::process::id()))
}

/// Replace `path` with `bytes` so readers observe either the old or the new contents.
///
/// Creates the parent directory if it has gone missing.
pub(crate) async fn write(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::store(parent, e))?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::store(&tmp, e));
    }

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::store(path, e));
    }

    Ok(())
}

/// Delete temporary files left in `dir` by writes that never reached the rename.
///
/// Only safe while no other handle is writing into `dir`. Returns the number removed.
pub(crate) async fn remove_stale(dir: &Path) -> Result<usize, Error> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::store(dir, e)),
    };

    let mut removed = 0;
    while let Some(item) = entries.next_entry().await.map_err(|e| Error::store(dir, e))? {
        let path = item.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(TMP_EXTENSION) {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove stale temp file"),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");

        write(&path, b"first").await.unwrap();
        write(&path, b"second").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_write_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");

        write(&path, b"{}").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_remove_stale_only_touches_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("record.4242.7.tmp"), b"partial").unwrap();
        std::fs::write(dir.path().join("index.4242.8.tmp"), b"partial").unwrap();
        write(&dir.path().join("record.json"), b"{}").await.unwrap();

        assert_eq!(remove_stale(dir.path()).await.unwrap(), 2);

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["record.json"]);
    }

    #[tokio::test]
    async fn test_remove_stale_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(remove_stale(&dir.path().join("gone")).await.unwrap(), 0);
    }
}
