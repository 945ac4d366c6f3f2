//! File-backed snapshot storage.
//!
//! Each key is stored as `<dir>/<key>.json`. Writes go to a uniquely named
//! sibling temp file that is then renamed over the target, so readers see
//! either the previous snapshot or the new one, never a torn write, and
//! concurrent writers never share a temp file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{SnapshotStorage, StoreError};

/// Snapshot storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read snapshot");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_creates_directory_and_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(tmp.path().join("nested"));

        storage.write("cartItems", "[]").unwrap();
        assert_eq!(storage.read("cartItems").as_deref(), Some("[]"));
        assert_eq!(file_names(&tmp.path().join("nested")), vec!["cartItems.json"]);
    }

    #[test]
    fn test_concurrent_writers_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(tmp.path());

        std::thread::scope(|scope| {
            for writer in 0..16 {
                let storage = &storage;
                scope.spawn(move || {
                    for round in 0..20 {
                        storage
                            .write("cartItems", &format!("[{writer},{round}]"))
                            .unwrap();
                    }
                });
            }
        });

        let raw = storage.read("cartItems").unwrap();
        assert!(raw.ends_with(",19]"), "last write of some writer wins: {raw}");
        assert_eq!(file_names(tmp.path()), vec!["cartItems.json"]);
    }

    #[test]
    fn test_read_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(tmp.path());
        assert!(storage.read("shippingInfo").is_none());
    }

    #[test]
    fn test_write_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(tmp.path());
        storage.write("cartItems", "[1]").unwrap();
        storage.write("cartItems", "[2]").unwrap();
        assert_eq!(storage.read("cartItems").as_deref(), Some("[2]"));
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(tmp.path());
        storage.remove("cartItems").unwrap();
        storage.write("cartItems", "[]").unwrap();
        storage.remove("cartItems").unwrap();
        assert!(storage.read("cartItems").is_none());
    }
}
