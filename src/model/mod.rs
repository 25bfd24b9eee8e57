//! Core data model types for docvault

mod checksum;
mod document;

pub use checksum::Checksum;
pub use document::{Document, DocumentId, StorageKey};
