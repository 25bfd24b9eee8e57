//! Filesystem blob store
//!
//! Each blob is one file under the store root, named by its [`StorageKey`].
//! Writes land in a hidden, randomly named `.<random>.partial` sibling first
//! and are renamed into place, so a blob file is never observed half-written.

use super::sync_dir;
use crate::model::{DocumentId, StorageKey};
use crate::{Error, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const PARTIAL_SUFFIX: &str = ".partial";

/// Raw document bytes on disk
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open a blob store rooted at `root`. The directory is created on first write.
    pub fn open(root: impl AsRef<Path>) -> Self {
        BlobStore {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Write `bytes` for a document, returning the key it was stored under
    pub fn put(&self, id: &DocumentId, filename: &str, bytes: &[u8]) -> Result<StorageKey> {
        let key = StorageKey::derive(id, filename);
        fs::create_dir_all(&self.root)?;

        // Dropped (and removed) on any error before persist
        let mut partial = tempfile::Builder::new()
            .prefix(".")
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&self.root)?;
        partial.write_all(bytes)?;
        partial.as_file().sync_all()?;
        partial.persist(self.path_for(&key)).map_err(|e| e.error)?;
        sync_dir(&self.root)?;

        tracing::debug!(key = %key, size = bytes.len(), "blob written");
        Ok(key)
    }

    /// Read a blob's bytes
    pub fn get(&self, key: &StorageKey) -> Result<Vec<u8>> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a blob. Returns `false` if it was already gone.
    pub fn delete(&self, key: &StorageKey) -> Result<bool> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists
    pub fn contains(&self, key: &StorageKey) -> bool {
        self.path_for(key).is_file()
    }

    /// All stored keys, sorted. In-flight partial writes are skipped.
    pub fn keys(&self) -> Result<Vec<StorageKey>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            keys.push(StorageKey::from_raw(name));
        }
        keys.sort();
        Ok(keys)
    }

    /// Get the filesystem path for a blob
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Get the store root
    pub fn root(&self) -> &Path {
        &self.root
    }
}
