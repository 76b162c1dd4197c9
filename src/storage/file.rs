//! File-backed storage backend.

use super::StorageBackend;
use crate::error::{Result, StoreError};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Durable backend storing one file per key under a base directory.
///
/// The stand-in for browser local storage when the stores run in a native
/// process: values survive restarts, and each write replaces the whole file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a backend rooted at `path`, creating the directory if needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Base directory for stored values.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        // Keys become file names; reject anything that could escape the
        // base directory.
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.path.join(format!("{key}.json")))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut value = String::new();
        file.read_to_string(&mut value)?;
        Ok(Some(value))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let mut file = File::create(&path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_absent_key() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("storage")).unwrap();
        assert_eq!(storage.read("cart-storage").unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("storage")).unwrap();

        storage.write("cart-storage", "{\"items\":[]}").unwrap();
        assert_eq!(
            storage.read("cart-storage").unwrap().as_deref(),
            Some("{\"items\":[]}")
        );
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("storage");

        {
            let storage = FileStorage::new(&base).unwrap();
            storage.write("favorites-storage", "persisted").unwrap();
        }

        let storage = FileStorage::new(&base).unwrap();
        assert_eq!(
            storage.read("favorites-storage").unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("storage")).unwrap();

        storage.write("k", "v").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.read("k").unwrap(), None);

        // Absent key is fine
        storage.remove("k").unwrap();
    }

    #[test]
    fn test_rejects_path_traversal_keys() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("storage")).unwrap();

        assert!(matches!(
            storage.write("../escape", "v"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(storage.read(""), Err(StoreError::InvalidKey(_))));
    }
}
