use uuid::Uuid;

use crate::{
    api::error,
    modules::file_upload::{model::NewFile, repository::FileRepository, schema::FileEntity},
};

#[derive(Clone)]
pub struct FilePgRepository {
    pool: sqlx::PgPool,
}

impl FilePgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FileRepository for FilePgRepository {
    async fn create(&self, file: &NewFile) -> Result<FileEntity, error::SystemError> {
        let id = Uuid::now_v7();
        let entity = sqlx::query_as::<_, FileEntity>(
            r#"
            INSERT INTO files (id, stored_name, original_name, mime_type, size_bytes, local_path, cloud_url, storage_mode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&file.stored_name)
        .bind(&file.original_name)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.local_path)
        .bind(&file.cloud_url)
        .bind(file.storage_mode)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn find_by_id(&self, file_id: &Uuid) -> Result<Option<FileEntity>, error::SystemError> {
        let file = sqlx::query_as::<_, FileEntity>("SELECT * FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    async fn find_all(&self) -> Result<Vec<FileEntity>, error::SystemError> {
        let files = sqlx::query_as::<_, FileEntity>(
            "SELECT * FROM files ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    async fn delete(&self, file_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }
}
