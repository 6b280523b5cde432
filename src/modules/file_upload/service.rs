use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::file_upload::{
    model::{BulkDeleteResponse, FailedDeletion, FileDownload, IncomingFile, NewFile},
    repository::FileRepository,
    rollback::Rollback,
    schema::{FileEntity, StorageMode},
    storage::{generate_stored_name, CloudStore, LocalStore, StorageError},
    validator::{ContentPolicy, ContentType},
};

#[derive(Clone)]
pub struct FileUploadService {
    repo: Arc<dyn FileRepository + Send + Sync>,
    local: Arc<dyn LocalStore>,
    cloud: Option<Arc<dyn CloudStore>>,
    policy: ContentPolicy,
}

impl FileUploadService {
    pub fn with_dependencies(
        repo: Arc<dyn FileRepository + Send + Sync>,
        local: Arc<dyn LocalStore>,
        cloud: Option<Arc<dyn CloudStore>>,
        policy: ContentPolicy,
    ) -> Self {
        tracing::info!(
            cloud_enabled = cloud.is_some(),
            "FileUploadService initialized"
        );
        Self {
            repo,
            local,
            cloud,
            policy,
        }
    }

    pub fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    fn cloud(&self) -> Result<Arc<dyn CloudStore>, StorageError> {
        self.cloud.clone().ok_or(StorageError::NotConfigured)
    }

    /// Validate and persist an upload to the stores implied by `mode`, then
    /// record its metadata. Any failure after a physical write undoes that
    /// write before the error is returned.
    ///
    /// The writes run on their own task, so a caller that goes away mid-upload
    /// still leaves either a complete record or nothing.
    pub async fn upload(
        &self,
        mode: StorageMode,
        file: IncomingFile,
    ) -> Result<FileEntity, error::SystemError> {
        let content_type = self
            .policy
            .validate(&file.bytes, &file.mime_type, &file.file_name)
            .map_err(|e| {
                tracing::warn!(
                    file_name = %file.file_name,
                    mime_type = %file.mime_type,
                    reason = %e,
                    "upload rejected"
                );
                e
            })?;

        if mode.has_cloud() {
            self.cloud()?;
        }

        let service = self.clone();
        let task = async move {
            service.store_and_record(mode, file, content_type).await
        };
        actix_web::rt::spawn(task)
            .await
            .map_err(|e| error::SystemError::InternalError(Box::new(e)))?
    }

    async fn store_and_record(
        &self,
        mode: StorageMode,
        file: IncomingFile,
        content_type: ContentType,
    ) -> Result<FileEntity, error::SystemError> {
        let stored_name = generate_stored_name(&file.file_name);
        let mut rollback = Rollback::new();

        match self
            .commit_upload(mode, &file, content_type, &stored_name, &mut rollback)
            .await
        {
            Ok(entity) => {
                rollback.commit();
                tracing::info!(
                    id = %entity.id,
                    stored_name = %entity.stored_name,
                    mode = ?mode,
                    size = entity.size_bytes,
                    "file uploaded"
                );
                Ok(entity)
            }
            Err(e) => {
                tracing::error!(
                    mode = ?mode,
                    file_name = %file.file_name,
                    stored_name = %stored_name,
                    error = %e,
                    "upload failed, rolling back"
                );
                rollback.unwind().await;
                Err(e)
            }
        }
    }

    async fn commit_upload(
        &self,
        mode: StorageMode,
        file: &IncomingFile,
        content_type: ContentType,
        stored_name: &str,
        rollback: &mut Rollback,
    ) -> Result<FileEntity, error::SystemError> {
        let local_path = if mode.has_local() {
            let path = self.local.store(&file.bytes, stored_name).await?;
            let store = self.local.clone();
            let undo_path = path.clone();
            rollback.push("remove local copy", async move {
                store.remove(&undo_path).await
            });
            Some(path)
        } else {
            None
        };

        let cloud_url = if mode.has_cloud() {
            let cloud = self.cloud()?;
            let url = cloud
                .upload(file.bytes.clone(), stored_name, content_type.mime())
                .await?;
            let key = stored_name.to_string();
            rollback.push("delete cloud object", async move {
                cloud.delete(&key).await
            });
            Some(url)
        } else {
            None
        };

        let new_file = NewFile {
            stored_name: stored_name.to_string(),
            original_name: file.file_name.clone(),
            mime_type: content_type.mime().to_string(),
            size_bytes: file.bytes.len() as i64,
            local_path,
            cloud_url,
            storage_mode: mode,
        };

        // commit point
        self.repo.create(&new_file).await
    }

    pub async fn get_file(&self, file_id: &Uuid) -> Result<FileEntity, error::SystemError> {
        self.repo
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("File not found"))
    }

    pub async fn list_files(&self) -> Result<Vec<FileEntity>, error::SystemError> {
        self.repo.find_all().await
    }

    /// Remove the stored bytes from every location, then the record. If a
    /// store fails the record is kept so the delete can be retried.
    pub async fn delete_file(&self, file_id: &Uuid) -> Result<FileEntity, error::SystemError> {
        let file = self.get_file(file_id).await?;

        if file.storage_mode.has_cloud() {
            let cloud = self.cloud()?;
            if let Err(e) = cloud.delete(&file.stored_name).await {
                tracing::error!(
                    id = %file.id,
                    key = %file.stored_name,
                    error = %e,
                    "cloud delete failed"
                );
                return Err(e.into());
            }
        }

        let local_path = file.local_path.as_deref();
        if let Some(path) = local_path.filter(|_| file.storage_mode.has_local()) {
            if let Err(e) = self.local.remove(path).await {
                tracing::error!(id = %file.id, path, error = %e, "local delete failed");
                return Err(e.into());
            }
        }

        if !self.repo.delete(file_id).await? {
            return Err(error::SystemError::not_found("File not found"));
        }

        tracing::info!(id = %file.id, mode = ?file.storage_mode, "file deleted");
        Ok(file)
    }

    /// Delete each id independently; one failure never stops the batch.
    pub async fn bulk_delete(&self, file_ids: Vec<String>) -> BulkDeleteResponse {
        let mut response = BulkDeleteResponse::default();

        for raw_id in file_ids {
            let outcome = match Uuid::parse_str(raw_id.trim()) {
                Ok(id) => self.delete_file(&id).await.map(|_| ()),
                Err(_) => Err(error::SystemError::not_found("File not found")),
            };

            match outcome {
                Ok(()) => response.successful.push(raw_id),
                Err(e) => {
                    let reason = match &e {
                        error::SystemError::NotFound(_) => "not found".into(),
                        other => other.client_message(),
                    };
                    tracing::warn!(id = %raw_id, error = %e, "bulk delete item failed");
                    response.failed.push(FailedDeletion {
                        id: raw_id,
                        error: reason.into_owned(),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = response.successful.len(),
            failed = response.failed.len(),
            "bulk delete finished"
        );
        response
    }

    /// Fully read the stored bytes so a missing or broken backend surfaces as
    /// an error rather than a truncated response.
    pub async fn download(&self, file_id: &Uuid) -> Result<FileDownload, error::SystemError> {
        let file = self.get_file(file_id).await?;

        let bytes = if file.storage_mode.has_cloud() {
            self.cloud()?.download(&file.stored_name).await
        } else {
            match file.local_path.as_deref() {
                Some(path) => self.local.read(path).await,
                None => Err(StorageError::NotFound(file.stored_name.clone())),
            }
        }
        .map_err(|e| {
            tracing::error!(
                id = %file.id,
                mode = ?file.storage_mode,
                error = %e,
                "download failed"
            );
            e
        })?;

        Ok(FileDownload {
            original_name: file.original_name,
            mime_type: file.mime_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{jpeg_bytes, pdf_bytes, png_bytes, Harness};
    use bytes::Bytes;
    use std::time::Duration;

    fn incoming(name: &str, mime: &str, bytes: Bytes) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            mime_type: mime.to_string(),
            bytes,
        }
    }

    fn png(name: &str) -> IncomingFile {
        incoming(name, "image/png", png_bytes(16))
    }

    fn jpeg(name: &str) -> IncomingFile {
        incoming(name, "image/jpeg", jpeg_bytes(32))
    }

    fn pdf(name: &str) -> IncomingFile {
        incoming(name, "application/pdf", pdf_bytes(16))
    }

    #[actix_web::test]
    async fn test_upload_then_get_matches_input() {
        let h = Harness::new();
        let cases = [
            (StorageMode::Local, png("cat.png")),
            (StorageMode::Cloud, pdf("scan 1.pdf")),
            (StorageMode::Both, jpeg("photo_2.jpg")),
        ];
        for (mode, file) in cases {
            let input = file.clone();
            let created = h.service.upload(mode, file).await.unwrap();
            let fetched = h.service.get_file(&created.id).await.unwrap();

            assert_eq!(fetched.storage_mode, mode);
            assert_eq!(fetched.original_name, input.file_name);
            assert_eq!(fetched.mime_type, input.mime_type);
            assert_eq!(fetched.size_bytes, input.bytes.len() as i64);
            assert_eq!(fetched.local_path.is_some(), mode.has_local());
            assert_eq!(fetched.cloud_url.is_some(), mode.has_cloud());
            assert_ne!(fetched.stored_name, input.file_name);
        }
        assert_eq!(h.local.len(), 2);
        assert_eq!(h.cloud.len(), 2);
    }

    #[actix_web::test]
    async fn test_validation_failure_writes_nothing() {
        let h = Harness::new();
        let exe = Bytes::from_static(b"MZ\x90\x00payload");
        let err = h
            .service
            .upload(StorageMode::Both, incoming("totally.png", "image/png", exe))
            .await
            .unwrap_err();

        assert!(matches!(err, error::SystemError::Validation(_)));
        assert_eq!(h.local.len(), 0);
        assert_eq!(h.cloud.len(), 0);
        assert_eq!(h.repo.len(), 0);
    }

    #[actix_web::test]
    async fn test_local_repository_failure_removes_file() {
        let h = Harness::new();
        h.repo.fail_create(true);

        let result = h.service.upload(StorageMode::Local, png("a.png")).await;

        assert!(result.is_err());
        assert_eq!(h.local.len(), 0);
        assert_eq!(h.local.removed().len(), 1);
        assert_eq!(h.repo.len(), 0);
    }

    #[actix_web::test]
    async fn test_cloud_repository_failure_deletes_cloud_object() {
        let h = Harness::new();
        h.repo.fail_create(true);

        let result = h.service.upload(StorageMode::Cloud, pdf("a.pdf")).await;

        assert!(result.is_err());
        let uploaded = h.cloud.uploaded();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(h.cloud.deleted(), uploaded);
        assert_eq!(h.cloud.len(), 0);
        assert_eq!(h.local.len(), 0);
    }

    #[actix_web::test]
    async fn test_both_repository_failure_deletes_both_copies() {
        let h = Harness::new();
        h.repo.fail_create(true);

        let result = h.service.upload(StorageMode::Both, jpeg("a.jpg")).await;

        assert!(result.is_err());
        assert_eq!(h.cloud.len(), 0);
        assert_eq!(h.cloud.deleted().len(), 1);
        assert_eq!(h.local.len(), 0);
        assert_eq!(h.local.removed().len(), 1);
    }

    #[actix_web::test]
    async fn test_both_cloud_failure_removes_local_copy() {
        let h = Harness::new();
        h.cloud.fail_upload(true);

        let err = h
            .service
            .upload(StorageMode::Both, jpeg("a.jpg"))
            .await
            .unwrap_err();

        assert!(matches!(err, error::SystemError::Storage(_)));
        assert_eq!(h.local.len(), 0);
        assert_eq!(h.local.removed().len(), 1);
        assert!(h.cloud.deleted().is_empty());
        assert_eq!(h.repo.len(), 0);
    }

    #[actix_web::test]
    async fn test_cloud_mode_without_cloud_store_fails_before_writing() {
        let h = Harness::without_cloud();

        let err = h
            .service
            .upload(StorageMode::Both, png("a.png"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            error::SystemError::Storage(StorageError::NotConfigured)
        ));
        assert_eq!(h.local.len(), 0);
        assert!(h.local.removed().is_empty());
    }

    #[actix_web::test]
    async fn test_delete_twice_reports_not_found() {
        let h = Harness::new();
        let created = h
            .service
            .upload(StorageMode::Both, png("a.png"))
            .await
            .unwrap();

        let deleted = h.service.delete_file(&created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert_eq!(h.local.len(), 0);
        assert_eq!(h.cloud.len(), 0);

        let err = h.service.delete_file(&created.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_delete_keeps_record_when_cloud_delete_fails() {
        let h = Harness::new();
        let created = h
            .service
            .upload(StorageMode::Cloud, pdf("a.pdf"))
            .await
            .unwrap();
        h.cloud.fail_delete(true);

        let err = h.service.delete_file(&created.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Storage(_)));
        assert!(h.service.get_file(&created.id).await.is_ok());
    }

    #[actix_web::test]
    async fn test_bulk_delete_partitions_results() {
        let h = Harness::new();
        let a = h
            .service
            .upload(StorageMode::Local, png("a.png"))
            .await
            .unwrap();
        let c = h
            .service
            .upload(StorageMode::Cloud, pdf("c.pdf"))
            .await
            .unwrap();
        let missing = Uuid::now_v7().to_string();

        let response = h
            .service
            .bulk_delete(vec![a.id.to_string(), missing.clone(), c.id.to_string()])
            .await;

        let expected_failed = vec![FailedDeletion {
            id: missing,
            error: "not found".to_string(),
        }];
        assert_eq!(response.successful, [a.id.to_string(), c.id.to_string()]);
        assert_eq!(response.failed, expected_failed);
        assert_eq!(h.repo.len(), 0);
    }

    #[actix_web::test]
    async fn test_bulk_delete_partition_ignores_input_order() {
        let h = Harness::new();
        let mut ids = Vec::new();
        for name in ["a.png", "b.png", "c.png"] {
            let created = h
                .service
                .upload(StorageMode::Local, png(name))
                .await
                .unwrap();
            ids.push(created.id.to_string());
        }
        let missing = Uuid::now_v7().to_string();
        let input = vec![
            missing.clone(),
            ids[2].clone(),
            "garbage".to_string(),
            ids[0].clone(),
            ids[1].clone(),
        ];

        let response = h.service.bulk_delete(input).await;

        let mut successful = response.successful.clone();
        successful.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(successful, expected);

        let mut failed: Vec<String> = response.failed.iter().map(|f| f.id.clone()).collect();
        failed.sort();
        let mut expected_failed = vec![missing, "garbage".to_string()];
        expected_failed.sort();
        assert_eq!(failed, expected_failed);
        assert!(response.failed.iter().all(|f| f.error == "not found"));
        assert_eq!(h.repo.len(), 0);
        assert_eq!(h.local.len(), 0);
    }

    #[actix_web::test]
    async fn test_abandoned_upload_is_rolled_back_when_cloud_fails() {
        let h = Harness::new();
        h.cloud.hold_uploads(true);

        let upload = h.service.upload(StorageMode::Both, png("a.png"));
        let timed_out = tokio::time::timeout(Duration::from_millis(50), upload).await;
        assert!(timed_out.is_err());

        h.cloud.fail_upload(true);
        h.cloud.hold_uploads(false);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(h.local.len(), 0);
        assert_eq!(h.local.removed().len(), 1);
        assert_eq!(h.cloud.len(), 0);
        assert_eq!(h.repo.len(), 0);
    }

    #[actix_web::test]
    async fn test_abandoned_upload_still_commits_when_stores_succeed() {
        let h = Harness::new();
        h.cloud.hold_uploads(true);

        let upload = h.service.upload(StorageMode::Both, png("a.png"));
        let timed_out = tokio::time::timeout(Duration::from_millis(50), upload).await;
        assert!(timed_out.is_err());

        h.cloud.hold_uploads(false);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let files = h.service.list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(h.local.len(), 1);
        assert_eq!(h.cloud.len(), 1);
        assert!(files[0].local_path.is_some());
        assert!(files[0].cloud_url.is_some());
    }

    #[actix_web::test]
    async fn test_bulk_delete_continues_past_storage_failure() {
        let h = Harness::new();
        let cloud_file = h
            .service
            .upload(StorageMode::Cloud, pdf("c.pdf"))
            .await
            .unwrap();
        let local_file = h
            .service
            .upload(StorageMode::Local, png("l.png"))
            .await
            .unwrap();
        h.cloud.fail_delete(true);

        let response = h
            .service
            .bulk_delete(vec![
                cloud_file.id.to_string(),
                "not-a-uuid".to_string(),
                local_file.id.to_string(),
            ])
            .await;

        assert_eq!(response.successful, vec![local_file.id.to_string()]);
        assert_eq!(response.failed.len(), 2);
        assert_eq!(response.failed[0].error, "Storage operation failed");
        assert_eq!(response.failed[1].error, "not found");
    }

    #[actix_web::test]
    async fn test_download_reads_from_the_right_store() {
        let h = Harness::new();
        let body = png_bytes(48);
        let local_file = incoming("l.png", "image/png", body.clone());
        let both_file = incoming("b.png", "image/png", body.clone());
        let local = h
            .service
            .upload(StorageMode::Local, local_file)
            .await
            .unwrap();
        let both = h
            .service
            .upload(StorageMode::Both, both_file)
            .await
            .unwrap();

        let from_disk = h.service.download(&local.id).await.unwrap();
        assert_eq!(from_disk.bytes, body);
        assert_eq!(from_disk.original_name, "l.png");

        // both-mode downloads come from the cloud copy
        h.local.clear();
        let from_cloud = h.service.download(&both.id).await.unwrap();
        assert_eq!(from_cloud.bytes, body);
        assert_eq!(from_cloud.mime_type, "image/png");
    }

    #[actix_web::test]
    async fn test_download_missing_bytes_is_storage_error() {
        let h = Harness::new();
        let created = h
            .service
            .upload(StorageMode::Local, png("l.png"))
            .await
            .unwrap();
        h.local.clear();

        let err = h.service.download(&created.id).await.unwrap_err();
        assert!(matches!(
            err,
            error::SystemError::Storage(StorageError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn test_list_is_newest_first() {
        let h = Harness::new();
        let first = h
            .service
            .upload(StorageMode::Local, png("1.png"))
            .await
            .unwrap();
        let second = h
            .service
            .upload(StorageMode::Local, png("2.png"))
            .await
            .unwrap();

        let files = h.service.list_files().await.unwrap();
        let ids: Vec<Uuid> = files.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
