//! Raw document bytes live behind `BlobStore`; the database only keeps the
//! locator. Content integrity (the SHA-256) is checked by the caller.

pub mod fs;
pub mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Blob {locator} does not match its recorded SHA-256")]
    Corrupted { locator: String },
}

pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the locator to persist.
    /// Writing the same key twice with the same bytes must succeed.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, BlobError>;

    fn get(&self, locator: &str) -> Result<Vec<u8>, BlobError>;
}

/// Content-addressed key: `<intake_id>/<sha256>.<ext>`.
pub fn blob_key(intake_id: &uuid::Uuid, sha256: &str, extension: &str) -> String {
    format!("{intake_id}/{sha256}.{extension}")
}

/// Fetch a document's bytes and check them against its recorded hash.
pub fn load_document_bytes(
    blobs: &dyn BlobStore,
    doc: &crate::models::Document,
) -> Result<Vec<u8>, BlobError> {
    let bytes = blobs.get(&doc.storage_locator)?;
    if crate::pipeline::import::content_hash(&bytes) != doc.sha256 {
        return Err(BlobError::Corrupted {
            locator: doc.storage_locator.clone(),
        });
    }
    Ok(bytes)
}

/// Reject keys that are empty, absolute, or climb out of the bucket.
pub(crate) fn validate_key(key: &str) -> Result<(), BlobError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(())
}
