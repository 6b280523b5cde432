use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use super::{check_key, LocalStore, StorageError, StorageResult};

/// Stores files flat under a single uploads directory.
#[derive(Clone)]
pub struct DiskStore {
    base_path: PathBuf,
}

impl DiskStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        tracing::info!(path = %base_path.display(), "local upload directory ready");
        Ok(Self { base_path })
    }

    /// Accepts only paths directly inside the uploads directory.
    fn owned_path(&self, path: &str) -> StorageResult<PathBuf> {
        let candidate = PathBuf::from(path);
        let name = candidate
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(path.to_string()))?;
        check_key(name)?;
        if candidate.parent() != Some(self.base_path.as_path()) {
            return Err(StorageError::InvalidKey(path.to_string()));
        }
        Ok(candidate)
    }
}

#[async_trait]
impl LocalStore for DiskStore {
    async fn store(&self, bytes: &[u8], stored_name: &str) -> StorageResult<String> {
        check_key(stored_name)?;
        let path = self.base_path.join(stored_name);
        fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "stored file on disk");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn read(&self, path: &str) -> StorageResult<Bytes> {
        let path = self.owned_path(path)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string_lossy().into_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        let path = self.owned_path(path)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed file from disk");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "file already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
