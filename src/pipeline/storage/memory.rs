use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{validate_key, BlobError, BlobStore};

/// In-process bucket. Counts `put` calls so callers can assert that a
/// rejected upload never reached storage.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, BlobError> {
        validate_key(key)?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Io(std::io::Error::other("blob map lock poisoned")))?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(key.to_string())
    }

    fn get(&self, locator: &str) -> Result<Vec<u8>, BlobError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Io(std::io::Error::other("blob map lock poisoned")))?;
        blobs
            .get(locator)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_put() {
        let store = MemoryBlobStore::new();
        store.put("a/b.png", b"1").unwrap();
        store.put("a/b.png", b"1").unwrap();
        assert_eq!(store.put_count(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a/b.png").unwrap(), b"1");
        assert!(store.get("a/c.png").is_err());
    }
}
