//! In-memory stand-ins for the repository and stores, shared by unit tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::api::error;
use crate::modules::file_upload::{
    model::NewFile,
    repository::FileRepository,
    schema::FileEntity,
    service::FileUploadService,
    storage::{CloudStore, LocalStore, StorageError, StorageResult},
    validator::ContentPolicy,
};

fn with_header(header: &[u8], len: usize) -> Bytes {
    let mut bytes = vec![0u8; len.max(header.len())];
    bytes[..header.len()].copy_from_slice(header);
    Bytes::from(bytes)
}

pub fn png_bytes(len: usize) -> Bytes {
    with_header(&[0x89, 0x50, 0x4E, 0x47], len)
}

pub fn jpeg_bytes(len: usize) -> Bytes {
    with_header(&[0xFF, 0xD8, 0xFF, 0xE1], len)
}

pub fn pdf_bytes(len: usize) -> Bytes {
    with_header(b"%PDF", len)
}

#[derive(Default)]
pub struct MemoryRepository {
    rows: Mutex<Vec<FileEntity>>,
    fail_create: AtomicBool,
}

impl MemoryRepository {
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl FileRepository for MemoryRepository {
    async fn create(&self, file: &NewFile) -> Result<FileEntity, error::SystemError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(error::SystemError::DatabaseError("connection reset".into()));
        }
        let entity = FileEntity {
            id: Uuid::now_v7(),
            stored_name: file.stored_name.clone(),
            original_name: file.original_name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size_bytes,
            local_path: file.local_path.clone(),
            cloud_url: file.cloud_url.clone(),
            storage_mode: file.storage_mode,
            created_at: chrono::Utc::now(),
        };
        self.rows.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, file_id: &Uuid) -> Result<Option<FileEntity>, error::SystemError> {
        Ok(self.rows.lock().unwrap().iter().find(|f| f.id == *file_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<FileEntity>, error::SystemError> {
        Ok(self.rows.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn delete(&self, file_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|f| f.id != *file_id);
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryLocalStore {
    files: Mutex<HashMap<String, Bytes>>,
    removed: Mutex<Vec<String>>,
}

impl MemoryLocalStore {
    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.files.lock().unwrap().clear();
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn store(&self, bytes: &[u8], stored_name: &str) -> StorageResult<String> {
        let path = format!("uploads/{stored_name}");
        self.files.lock().unwrap().insert(path.clone(), Bytes::copy_from_slice(bytes));
        Ok(path)
    }

    async fn read(&self, path: &str) -> StorageResult<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        self.files.lock().unwrap().remove(path);
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCloudStore {
    objects: Mutex<HashMap<String, Bytes>>,
    uploaded: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_upload: AtomicBool,
    fail_delete: AtomicBool,
    hold_uploads: AtomicBool,
}

impl MemoryCloudStore {
    pub fn fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Park every upload until released.
    pub fn hold_uploads(&self, hold: bool) {
        self.hold_uploads.store(hold, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudStore for MemoryCloudStore {
    async fn upload(&self, bytes: Bytes, key: &str, _content_type: &str) -> StorageResult<String> {
        while self.hold_uploads.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(StorageError::UnexpectedStatus {
                operation: "upload",
                status: 503,
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        self.uploaded.lock().unwrap().push(key.to_string());
        Ok(format!("https://cdn.test/files/{key}"))
    }

    async fn download(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::UnexpectedStatus {
                operation: "delete",
                status: 500,
            });
        }
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// A service wired to in-memory fakes, with handles kept for assertions.
pub struct Harness {
    pub service: FileUploadService,
    pub repo: Arc<MemoryRepository>,
    pub local: Arc<MemoryLocalStore>,
    pub cloud: Arc<MemoryCloudStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(true)
    }

    pub fn without_cloud() -> Self {
        Self::build(false)
    }

    fn build(with_cloud: bool) -> Self {
        let repo = Arc::new(MemoryRepository::default());
        let local = Arc::new(MemoryLocalStore::default());
        let cloud = Arc::new(MemoryCloudStore::default());
        let cloud_dep: Option<Arc<dyn CloudStore>> = if with_cloud {
            Some(cloud.clone())
        } else {
            None
        };
        let service = FileUploadService::with_dependencies(
            repo.clone(),
            local.clone(),
            cloud_dep,
            ContentPolicy::default(),
        );
        Self {
            service,
            repo,
            local,
            cloud,
        }
    }
}
