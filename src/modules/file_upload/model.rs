use bytes::Bytes;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::file_upload::schema::StorageMode;

/// New file metadata to insert into database
#[derive(Debug, Clone)]
pub struct NewFile {
    pub stored_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub local_path: Option<String>,
    pub cloud_url: Option<String>,
    pub storage_mode: StorageMode,
}

/// A file received from a client, buffered in memory.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Bytes and response metadata for a download.
#[derive(Debug)]
pub struct FileDownload {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteModel {
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FailedDeletion {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkDeleteResponse {
    pub successful: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}
