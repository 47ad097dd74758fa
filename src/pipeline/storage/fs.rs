use std::io::Write;
use std::path::{Path, PathBuf};

use super::{validate_key, BlobError, BlobStore};

/// Local-disk bucket. Locators are keys relative to the bucket root.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let path = self.path_for(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| BlobError::InvalidKey(key.to_string()))?;
        std::fs::create_dir_all(parent)?;

        // Write to a unique sibling then rename, so readers never see a torn file.
        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let written = (|| {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            std::fs::rename(&tmp, &path)
        })();
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!(key, size = bytes.len(), "Blob stored");
        Ok(key.to_string())
    }

    fn get(&self, locator: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(locator)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(locator.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
