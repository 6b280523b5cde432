use uuid::Uuid;

use crate::{
    api::error,
    modules::file_upload::{model::NewFile, schema::FileEntity},
};

#[async_trait::async_trait]
pub trait FileRepository {
    async fn create(&self, file: &NewFile) -> Result<FileEntity, error::SystemError>;

    async fn find_by_id(&self, file_id: &Uuid) -> Result<Option<FileEntity>, error::SystemError>;

    /// All records, newest first.
    async fn find_all(&self) -> Result<Vec<FileEntity>, error::SystemError>;

    /// Returns `false` when no record with that id existed.
    async fn delete(&self, file_id: &Uuid) -> Result<bool, error::SystemError>;
}
