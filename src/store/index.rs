//! Ordered metadata index persisted as a single JSON snapshot
//!
//! Snapshot format: a pretty-printed JSON array of [`Document`] records in
//! insertion order. Every mutation rewrites the whole array into a fresh
//! temporary file beside the snapshot and renames it over the snapshot, so a
//! crash leaves either the previous or the next state on disk, never a
//! truncated file.
//!
//! Several processes may open the same snapshot. Mutations take the
//! `<snapshot>.lock` file exclusively and re-read the snapshot under it, so a
//! change is always applied to the latest persisted state. Reads serve the
//! in-memory copy, reloading it first if the snapshot changed on disk.

use super::{sync_dir, LockFile};
use crate::model::{Document, DocumentId};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

/// Identifies one version of the snapshot file
type Stamp = (u64, SystemTime);

struct Cached {
    records: Vec<Document>,
    /// Snapshot version `records` was read from or written as
    stamp: Option<Stamp>,
}

/// The durable, ordered collection of document records.
///
/// A mutation holds the in-memory write lock and the snapshot lock file
/// across reload, change and rewrite. The in-memory copy is only replaced
/// once the rewrite succeeded, so memory never holds a state that failed to
/// persist.
pub struct MetadataIndex {
    /// Path to the snapshot file
    path: PathBuf,
    lock: LockFile,
    cache: RwLock<Cached>,
}

impl MetadataIndex {
    /// Load the index from `path`, or start empty if no snapshot exists
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (records, stamp) = read_snapshot(&path)?;

        tracing::info!(path = %path.display(), documents = records.len(), "index loaded");

        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");

        Ok(MetadataIndex {
            lock: LockFile::new(path.with_file_name(lock_name)),
            path,
            cache: RwLock::new(Cached { records, stamp }),
        })
    }

    /// Add a record at the end and persist
    pub fn append(&self, record: Document) -> Result<()> {
        self.mutate(|records| {
            if records.iter().any(|r| r.id == record.id) {
                return Err(Error::DuplicateId(record.id.to_string()));
            }
            records.push(record);
            Ok(())
        })
    }

    /// Remove the record for `id` and persist, returning the removed record
    pub fn remove(&self, id: &DocumentId) -> Result<Document> {
        self.mutate(|records| {
            let pos = records
                .iter()
                .position(|r| &r.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            Ok(records.remove(pos))
        })
    }

    /// Look up a record by id
    pub fn find(&self, id: &DocumentId) -> Result<Document> {
        self.refresh();
        self.cache
            .read()
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Copy of all records in insertion order
    pub fn list(&self) -> Vec<Document> {
        self.refresh();
        self.cache.read().records.clone()
    }

    /// Write the persisted state back out, creating an empty snapshot if none exists
    pub fn flush(&self) -> Result<()> {
        self.mutate(|_| Ok(()))
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the snapshot path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut Vec<Document>) -> Result<T>) -> Result<T> {
        let mut cache = self.cache.write();
        self.lock.exclusive(|| {
            let (mut records, _) = read_snapshot(&self.path)?;
            let out = change(&mut records)?;
            write_snapshot(&self.path, &records)?;

            cache.stamp = stamp_of(&self.path);
            cache.records = records;
            Ok(out)
        })
    }

    /// Reload the in-memory copy if another writer replaced the snapshot
    fn refresh(&self) {
        let current = stamp_of(&self.path);
        if self.cache.read().stamp == current {
            return;
        }

        let mut cache = self.cache.write();
        match read_snapshot(&self.path) {
            Ok((records, stamp)) => {
                tracing::debug!(path = %self.path.display(), documents = records.len(), "index reloaded");
                *cache = Cached { records, stamp };
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "index reload failed, serving cached records");
            }
        }
    }
}

fn read_snapshot(path: &Path) -> Result<(Vec<Document>, Option<Stamp>)> {
    if !path.exists() {
        return Ok((Vec::new(), None));
    }

    // Stamp first: if the file is replaced mid-read the stale stamp forces another reload
    let stamp = stamp_of(path);
    let content = fs::read(path)?;
    let records: Vec<Document> =
        serde_json::from_slice(&content).map_err(|e| Error::CorruptIndex {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if let Some(id) = first_duplicate(&records) {
        return Err(Error::CorruptIndex {
            path: path.to_path_buf(),
            reason: format!("duplicate id {}", id),
        });
    }
    Ok((records, stamp))
}

fn write_snapshot(path: &Path, records: &[Document]) -> Result<()> {
    let data = serde_json::to_vec_pretty(records)?;

    replace_file(path, &data).map_err(|source| Error::Persistence {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), documents = records.len(), "index snapshot written");
    Ok(())
}

fn replace_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(parent)
}

fn stamp_of(path: &Path) -> Option<Stamp> {
    let meta = fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()?))
}

fn first_duplicate(records: &[Document]) -> Option<&DocumentId> {
    let mut seen = HashSet::new();
    records.iter().map(|r| &r.id).find(|id| !seen.insert(*id))
}
