//! Error types for docvault

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docvault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docvault operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No record with this id exists in the index
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The index has a record but its blob is gone
    #[error("Blob missing for document {id} (expected {storage_key})")]
    MissingBlob { id: String, storage_key: String },

    #[error("Corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Failed to persist index to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for the errors a caller should see as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::MissingBlob { .. })
    }
}
