//! Storage layer
//!
//! Two independent stores with no shared transaction: the [`BlobStore`]
//! holds document bytes, the [`MetadataIndex`] holds the records that point
//! at them. Keeping the two consistent is the job of
//! [`DocumentService`](crate::DocumentService).

mod blob;
mod index;
mod lock;

pub use blob::BlobStore;
pub use index::MetadataIndex;
pub use lock::LockFile;

use std::path::Path;

/// Flush a directory entry change (create, rename) to disk
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
