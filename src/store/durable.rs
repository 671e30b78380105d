//! Crash-safe persistence of collection snapshots.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::paths::{collection_dir, snapshot_path};
use crate::store::snapshot::Snapshot;

/// Write `bytes` to `target` so that readers see either the old or the new
/// content, never a mix.
///
/// The data goes to a temporary file in the target's directory, is flushed to
/// disk, and then renamed over the target. The temporary file is removed if
/// any step fails.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    // NamedTempFile deletes itself on drop until persisted
    let mut temp = tempfile::Builder::new()
        .prefix(".harvest-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    temp.persist(target).map_err(|e| Error::Persist {
        path: target.display().to_string(),
        message: e.error.to_string(),
    })?;

    Ok(())
}

fn read_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };
    Ok(Some(serde_json::from_slice(&content)?))
}

/// Snapshot storage rooted at the data directory.
#[derive(Debug, Clone)]
pub struct DurableStore {
    root: PathBuf,
}

impl DurableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a collection's snapshot and asset files.
    pub fn collection_dir(&self, key: &str) -> Result<PathBuf> {
        collection_dir(&self.root, key)
    }

    /// Location of a collection's snapshot document.
    pub fn snapshot_path(&self, key: &str) -> Result<PathBuf> {
        snapshot_path(&self.root, key)
    }

    /// Load a collection's snapshot. `Ok(None)` when none was saved yet.
    ///
    /// Reading and parsing run on the blocking pool.
    pub async fn load(&self, key: &str) -> Result<Option<Snapshot>> {
        let path = self.snapshot_path(key)?;
        let loaded = tokio::task::spawn_blocking(move || read_snapshot(&path))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        if let Some(snapshot) = &loaded {
            tracing::debug!(
                "Loaded snapshot for {} ({} records)",
                key,
                snapshot.records.len()
            );
        }
        Ok(loaded)
    }

    /// Atomically replace a collection's snapshot.
    ///
    /// Serialization happens on the caller's task; the blocking write and
    /// fsync run on the blocking pool.
    pub async fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let path = self.snapshot_path(key)?;
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let size = bytes.len();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        tracing::debug!("Saved snapshot for {} ({} bytes)", key, size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().map(|e| e == "tmp").unwrap_or(false))
            .collect()
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("doc.json");

        assert_ok!(write_atomic(&target, b"first"));
        assert_ok!(write_atomic(&target, b"second"));

        assert_eq!(fs::read(&target).unwrap(), b"second");
        assert!(temp_files(target.parent().unwrap()).is_empty());
    }

    #[test]
    fn test_write_atomic_failure_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.json");
        fs::write(&target, b"old").unwrap();

        // A directory in the way makes the final rename fail.
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("child"), b"x").unwrap();
        assert!(write_atomic(&blocked, b"new").is_err());

        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::new(dir.path());
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::new(dir.path());

        let mut snapshot = Snapshot::new("someone");
        snapshot
            .records
            .push(Record::from_value(json!({"id_str": "10", "text": "x"})));
        snapshot.cursor = Some("10".into());
        snapshot.pages_fetched = 1;
        snapshot.retry_ledger.record_attempt("10", "https://m/a.jpg");

        store.save("someone", &snapshot).await.unwrap();
        let loaded = store.load("someone").await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(store
            .snapshot_path("someone")
            .unwrap()
            .starts_with(dir.path().join("someone")));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::new(dir.path());
        let path = store.snapshot_path("someone").unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{\"collectionKey\": \"someone\", \"records\": [").unwrap();

        assert!(matches!(store.load("someone").await, Err(Error::Json(_))));
    }
}
