use actix_multipart::{Multipart, MultipartError};
use actix_web::{
    http::header::{ContentDisposition, CONTENT_DISPOSITION},
    web, HttpResponse,
};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::api::{error, success};
use crate::modules::file_upload::{
    model::{BulkDeleteModel, BulkDeleteResponse, IncomingFile},
    schema::{FileEntity, StorageMode},
    service::FileUploadService,
    validator::ValidationFailure,
};
use crate::utils::ValidatedJson;

const FILE_FIELD: &str = "file";

fn malformed(e: MultipartError) -> error::Error {
    error::Error::bad_request(e.to_string())
}

/// Pull the `file` field out of a multipart body. At most `limit + 1` bytes
/// are buffered; anything larger is cut short and left for the validator to
/// reject as oversized.
async fn read_file_field(
    mut payload: Multipart,
    limit: usize,
) -> Result<IncomingFile, error::Error> {
    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        if field.name() != Some(FILE_FIELD) {
            while field.try_next().await.map_err(malformed)?.is_some() {}
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .ok_or_else(|| error::Error::bad_request("Missing filename"))?
            .to_string();

        let mime_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut bytes = BytesMut::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            let room = (limit + 1).saturating_sub(bytes.len());
            bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if bytes.len() > limit {
                break;
            }
        }

        return Ok(IncomingFile {
            file_name,
            mime_type,
            bytes: bytes.freeze(),
        });
    }

    Err(error::Error::bad_request(
        ValidationFailure::MissingFile.to_string(),
    ))
}

/// Upload file handler
pub async fn upload_file(
    mode: web::Path<String>,
    payload: Multipart,
    service: web::Data<FileUploadService>,
) -> Result<success::Success<FileEntity>, error::Error> {
    let mode = mode
        .parse::<StorageMode>()
        .map_err(|_| error::Error::not_found("Unknown storage mode"))?;

    let limit = service.policy().max_upload_bytes();
    let file = read_file_field(payload, limit).await?;
    let entity = service.upload(mode, file).await?;

    let response = success::Success::created(Some(entity));
    Ok(response.message("File uploaded successfully"))
}

pub async fn list_files(
    service: web::Data<FileUploadService>,
) -> Result<success::Success<Vec<FileEntity>>, error::Error> {
    let files = service.list_files().await?;
    Ok(success::Success::ok(Some(files)))
}

/// Get file metadata handler
pub async fn get_file(
    file_id: web::Path<Uuid>,
    service: web::Data<FileUploadService>,
) -> Result<success::Success<FileEntity>, error::Error> {
    let file = service.get_file(&file_id.into_inner()).await?;
    Ok(success::Success::ok(Some(file)))
}

/// Delete file handler
pub async fn delete_file(
    file_id: web::Path<Uuid>,
    service: web::Data<FileUploadService>,
) -> Result<success::Success<FileEntity>, error::Error> {
    let file = service.delete_file(&file_id.into_inner()).await?;
    let response = success::Success::ok(Some(file));
    Ok(response.message("File deleted successfully"))
}

pub async fn bulk_delete(
    body: ValidatedJson<BulkDeleteModel>,
    service: web::Data<FileUploadService>,
) -> Result<success::Success<BulkDeleteResponse>, error::Error> {
    let result = service.bulk_delete(body.0.file_ids).await;
    let response = success::Success::ok(Some(result));
    Ok(response.message("Bulk delete processed"))
}

pub async fn download_file(
    file_id: web::Path<Uuid>,
    service: web::Data<FileUploadService>,
) -> Result<HttpResponse, error::Error> {
    let download = service.download(&file_id.into_inner()).await?;
    let disposition = ContentDisposition::attachment(download.original_name);

    Ok(HttpResponse::Ok()
        .content_type(download.mime_type)
        .insert_header((CONTENT_DISPOSITION, disposition))
        .body(download.bytes))
}
