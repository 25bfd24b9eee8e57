//! # docvault
//!
//! A filesystem-backed document store with a durable metadata index.
//!
//! Document bytes live as plain files in a blob directory; their metadata
//! lives in a single JSON snapshot. The two stores share no transaction, so
//! [`DocumentService`] orders every operation so that a crash or I/O failure
//! can at worst leave an unreferenced blob behind, never a record without
//! content.
//!
//! ## Core Concepts
//!
//! - **Documents**: metadata records (id, filename, content type, download URL)
//! - **Blobs**: raw uploaded bytes, stored as `<id>_<filename>`
//! - **Index**: the ordered, persisted list of documents
//!
//! ## Example
//!
//! ```ignore
//! use docvault::{DocumentService, VaultConfig};
//!
//! let vault = DocumentService::init(VaultConfig::new(".docvault"))?;
//! let doc = vault.upload("report.pdf", Some("application/pdf".into()), &bytes)?;
//! let download = vault.download(&doc.id)?;
//! vault.delete(&doc.id)?;
//! ```

pub mod config;
pub mod model;
pub mod store;

mod error;
mod service;

pub use config::VaultConfig;
pub use error::{Error, Result};
pub use model::{Checksum, Document, DocumentId, StorageKey};
pub use service::{CheckReport, DocumentService, Download, VaultStats};
pub use store::{BlobStore, LockFile, MetadataIndex};
