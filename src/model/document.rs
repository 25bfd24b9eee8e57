//! Document record - the metadata describing one uploaded file

use super::Checksum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a document.
///
/// Freshly generated ids are UUID v4 strings. Ids read back from a snapshot
/// are taken as-is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentId(id.into())
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        DocumentId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        DocumentId(s)
    }
}

impl From<&DocumentId> for DocumentId {
    fn from(id: &DocumentId) -> Self {
        id.clone()
    }
}

/// Name of a blob file inside the blob directory: `<id>_<filename>`.
///
/// Path separators, NUL and control characters in the filename are replaced
/// with `_`, so a key is always a single path component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Derive the key for a document id and original filename
    pub fn derive(id: &DocumentId, filename: &str) -> Self {
        StorageKey(format!("{}_{}", id.0, sanitize_filename(filename)))
    }

    /// Wrap a raw key, e.g. a file name read back from the blob directory
    pub fn from_raw(key: impl Into<String>) -> Self {
        StorageKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Metadata for one stored document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,

    /// Name supplied by the uploader, kept verbatim
    pub filename: String,

    /// MIME type, if the uploader supplied one
    pub content_type: Option<String>,

    pub download_url: String,

    /// Content length in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
}

impl Document {
    /// Create a record for `id`, with its download URL under `download_prefix`
    pub fn new(
        id: DocumentId,
        filename: impl Into<String>,
        content_type: Option<String>,
        download_prefix: &str,
    ) -> Self {
        let download_url = format!("{}/{}", download_prefix.trim_end_matches('/'), id);
        Document {
            id,
            filename: filename.into(),
            content_type,
            download_url,
            size: None,
            checksum: None,
        }
    }

    /// Record the size and checksum of the uploaded content
    pub fn with_content(mut self, bytes: &[u8]) -> Self {
        self.size = Some(bytes.len() as u64);
        self.checksum = Some(Checksum::digest(bytes));
        self
    }

    /// Where this document's blob lives in the blob store
    pub fn storage_key(&self) -> StorageKey {
        StorageKey::derive(&self.id, &self.filename)
    }
}
