//! Physical byte stores behind the upload pipeline.

pub mod cloud;
pub mod local;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

pub use cloud::SupabaseStore;
pub use local::DiskStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} returned unexpected status {status}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
    },

    #[error("Cloud storage is not configured")]
    NotConfigured,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Local filesystem store addressed by generated names.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Write `bytes` under `stored_name` and return the resulting path.
    async fn store(&self, bytes: &[u8], stored_name: &str) -> StorageResult<String>;

    async fn read(&self, path: &str) -> StorageResult<Bytes>;

    /// Remove a previously stored file. A missing file is not an error.
    async fn remove(&self, path: &str) -> StorageResult<()>;
}

/// Remote object store addressed by key.
#[async_trait]
pub trait CloudStore: Send + Sync {
    /// Upload `bytes` under `key` and return its public URL.
    async fn upload(&self, bytes: Bytes, key: &str, content_type: &str) -> StorageResult<String>;

    async fn download(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete the object at `key`. An already absent object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Random 128-bit hex name carrying the original file's extension.
pub fn generate_stored_name(original_name: &str) -> String {
    let stem = hex::encode(rand::random::<[u8; 16]>());
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.contains('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
