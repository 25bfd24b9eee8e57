//! Advisory lock files
//!
//! Every process working on a vault opens the same lock file, so the locks
//! here order writers across processes as well as across threads. Each
//! acquisition opens its own handle, and the lock is released when the
//! handle is dropped.

use crate::{Error, Result};
use fd_lock::RwLock as FileLock;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// A lock file guarding some shared on-disk state
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LockFile { path: path.into() }
    }

    /// Run `f` while holding the lock exclusively
    pub fn exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut lock = self.open()?;
        let _held = lock.write().map_err(|source| self.error(source))?;
        f()
    }

    /// Run `f` while holding the lock shared with other shared holders
    pub fn shared<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.open()?;
        let _held = lock.read().map_err(|source| self.error(source))?;
        f()
    }

    /// Get the lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<FileLock<File>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.error(source))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| self.error(source))?;
        Ok(FileLock::new(file))
    }

    fn error(&self, source: std::io::Error) -> Error {
        Error::Lock {
            path: self.path.clone(),
            source,
        }
    }
}
