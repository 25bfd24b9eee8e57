//! High-level document API
//!
//! [`DocumentService`] is the only mutator of the blob store and the index.
//! It orders every two-step operation so that a failure halfway leaves an
//! orphan blob (wasted space) rather than a record with no content:
//!
//! - upload: write blob, then append record
//! - delete: remove blob, then remove record

use crate::config::VaultConfig;
use crate::model::{Checksum, Document, DocumentId, StorageKey};
use crate::store::{BlobStore, LockFile, MetadataIndex};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Content and metadata returned by [`DocumentService::download`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// `None` means the MIME type is unknown
    pub content_type: Option<String>,
    pub filename: String,
}

/// Summary of a vault, for status reporting
#[derive(Clone, Debug, Serialize)]
pub struct VaultStats {
    pub documents: usize,
    /// Sum of recorded sizes; records without a size are not counted
    pub total_bytes: u64,
    pub root: PathBuf,
    pub snapshot: PathBuf,
    pub blob_dir: PathBuf,
}

/// Result of comparing the index against the blob directory
#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckReport {
    /// Number of records examined
    pub checked: usize,
    /// Records whose blob does not exist
    pub missing_blobs: Vec<DocumentId>,
    /// Records whose blob size or checksum disagrees with the record
    pub mismatched: Vec<DocumentId>,
    /// Blob files no record points at
    #[serde(serialize_with = "serialize_keys")]
    pub orphan_blobs: Vec<StorageKey>,
}

impl CheckReport {
    /// True if every record has an intact blob and no blob is unreferenced
    pub fn is_clean(&self) -> bool {
        self.missing_blobs.is_empty() && self.mismatched.is_empty() && self.orphan_blobs.is_empty()
    }
}

fn serialize_keys<S: serde::Serializer>(
    keys: &[StorageKey],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(keys.iter().map(|k| k.as_str()))
}

/// The document store: upload, list, download and delete over a blob
/// directory and a persisted metadata index.
///
/// Shareable across threads behind an `Arc`. Several processes may open the
/// same vault; the index and the upload gate are guarded by lock files.
pub struct DocumentService {
    config: VaultConfig,
    blobs: BlobStore,
    index: MetadataIndex,
    /// Held shared by uploads between blob write and index append, and
    /// exclusively while deciding which blobs are orphans.
    upload_gate: LockFile,
}

impl DocumentService {
    /// Open the vault described by `config`.
    ///
    /// Fails with [`Error::CorruptIndex`] if the snapshot exists but cannot be read.
    pub fn open(config: VaultConfig) -> Result<Self> {
        let index = MetadataIndex::load(config.snapshot_path())?;
        let blobs = BlobStore::open(config.blob_dir());
        let upload_gate = LockFile::new(config.upload_gate_path());
        Ok(DocumentService {
            config,
            blobs,
            index,
            upload_gate,
        })
    }

    /// Open the vault at `root`, reading its `docvault.json` if present
    pub fn open_root(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(VaultConfig::load(root.into())?)
    }

    /// Open a vault, creating its directories and an empty snapshot if needed
    pub fn init(config: VaultConfig) -> Result<Self> {
        std::fs::create_dir_all(config.blob_dir())?;
        let service = Self::open(config)?;
        if !service.index.path().exists() {
            service.index.flush()?;
        }
        tracing::info!(root = %service.config.root.display(), "vault initialized");
        Ok(service)
    }

    // === Document Operations ===

    /// Store a new document and return its record
    pub fn upload(
        &self,
        filename: impl Into<String>,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<Document> {
        let filename = filename.into();
        self.upload_gate
            .shared(|| self.store_new(filename, content_type, bytes))
    }

    fn store_new(
        &self,
        filename: String,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<Document> {
        let id = self.fresh_id();
        let record = Document::new(id, filename, content_type, &self.config.download_prefix)
            .with_content(bytes);

        let key = self.blobs.put(&record.id, &record.filename, bytes)?;

        if let Err(e) = self.index.append(record.clone()) {
            tracing::warn!(
                id = %record.id,
                key = %key,
                error = %e,
                "index append failed, blob left orphaned"
            );
            return Err(e);
        }

        tracing::info!(
            id = %record.id,
            filename = %record.filename,
            size = bytes.len(),
            "document uploaded"
        );
        Ok(record)
    }

    /// All records in upload order
    pub fn list(&self) -> Vec<Document> {
        self.index.list()
    }

    /// Fetch a document's content.
    ///
    /// [`Error::NotFound`] if the id is unknown, [`Error::MissingBlob`] if the
    /// record exists but its blob does not.
    pub fn download(&self, id: &DocumentId) -> Result<Download> {
        let record = self.index.find(id)?;
        let key = record.storage_key();

        let bytes = match self.blobs.get(&key) {
            Ok(bytes) => bytes,
            Err(Error::NotFound(_)) => {
                tracing::warn!(id = %id, key = %key, "indexed document has no blob");
                return Err(Error::MissingBlob {
                    id: id.to_string(),
                    storage_key: key.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        Ok(Download {
            bytes,
            content_type: record.content_type,
            filename: record.filename,
        })
    }

    /// Delete a document.
    ///
    /// A record whose blob is already gone is still removed.
    pub fn delete(&self, id: &DocumentId) -> Result<()> {
        let record = self.index.find(id)?;
        let key = record.storage_key();

        if !self.blobs.delete(&key)? {
            tracing::warn!(id = %id, key = %key, "blob already absent on delete");
        }
        self.index.remove(id)?;

        tracing::info!(id = %id, filename = %record.filename, "document deleted");
        Ok(())
    }

    // === Maintenance ===

    /// Document count and locations
    pub fn stats(&self) -> VaultStats {
        let records = self.index.list();
        VaultStats {
            documents: records.len(),
            total_bytes: records.iter().filter_map(|r| r.size).sum(),
            root: self.config.root.clone(),
            snapshot: self.index.path().to_path_buf(),
            blob_dir: self.blobs.root().to_path_buf(),
        }
    }

    /// Compare the index against the blob directory without changing either
    pub fn check(&self) -> Result<CheckReport> {
        let (records, orphan_blobs) = self.upload_gate.exclusive(|| {
            let records = self.index.list();
            let orphans = self.orphans(&records)?;
            Ok((records, orphans))
        })?;

        let mut report = CheckReport {
            checked: records.len(),
            orphan_blobs,
            ..Default::default()
        };

        for record in &records {
            let bytes = match self.blobs.get(&record.storage_key()) {
                Ok(bytes) => bytes,
                Err(Error::NotFound(_)) => {
                    report.missing_blobs.push(record.id.clone());
                    continue;
                }
                Err(e) => return Err(e),
            };

            let size_ok = record.size.map_or(true, |size| size == bytes.len() as u64);
            let checksum_ok = record
                .checksum
                .map_or(true, |checksum| checksum == Checksum::digest(&bytes));
            if !(size_ok && checksum_ok) {
                report.mismatched.push(record.id.clone());
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                missing = report.missing_blobs.len(),
                mismatched = report.mismatched.len(),
                orphans = report.orphan_blobs.len(),
                "vault check found inconsistencies"
            );
        }
        Ok(report)
    }

    /// Delete blobs no record points at, returning their keys
    pub fn prune_orphans(&self) -> Result<Vec<StorageKey>> {
        self.upload_gate.exclusive(|| {
            let orphans = self.orphans(&self.index.list())?;

            let mut removed = Vec::with_capacity(orphans.len());
            for key in orphans {
                if self.blobs.delete(&key)? {
                    tracing::info!(key = %key, "orphan blob removed");
                    removed.push(key);
                }
            }
            Ok(removed)
        })
    }

    /// Get the vault configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    fn orphans(&self, records: &[Document]) -> Result<Vec<StorageKey>> {
        let referenced: HashSet<StorageKey> = records.iter().map(|r| r.storage_key()).collect();
        Ok(self
            .blobs
            .keys()?
            .into_iter()
            .filter(|key| !referenced.contains(key))
            .collect())
    }

    /// A random id not present in the index
    fn fresh_id(&self) -> DocumentId {
        loop {
            let id = DocumentId::generate();
            if self.index.find(&id).is_err() {
                return id;
            }
        }
    }
}
