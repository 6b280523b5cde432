use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{check_key, CloudStore, StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub bucket: String,
    pub timeout: Duration,
}

/// Supabase Storage over its REST API.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    storage_url: String,
    key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct SignedUpload {
    url: String,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> StorageResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            storage_url: format!("{}/storage/v1", config.url.trim_end_matches('/')),
            key: config.key,
            bucket: config.bucket,
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.storage_url, self.bucket, key)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.key).header("apikey", &self.key)
    }

    /// Asks the control plane for a short-lived URL that accepts a direct PUT.
    async fn signed_upload_url(&self, key: &str) -> StorageResult<String> {
        let endpoint = format!(
            "{}/object/upload/sign/{}/{}",
            self.storage_url, self.bucket, key
        );
        let response = self.authorized(self.client.post(endpoint)).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                operation: "create signed upload url",
                status: response.status().as_u16(),
            });
        }
        let signed: SignedUpload = response.json().await?;
        Ok(format!("{}{}", self.storage_url, signed.url))
    }
}

#[async_trait]
impl CloudStore for SupabaseStore {
    async fn upload(&self, bytes: Bytes, key: &str, content_type: &str) -> StorageResult<String> {
        check_key(key)?;
        let signed_url = self.signed_upload_url(key).await?;
        tracing::debug!(key, bucket = %self.bucket, "obtained signed upload url");

        let size = bytes.len();
        let response = self
            .client
            .put(signed_url)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                operation: "upload",
                status: response.status().as_u16(),
            });
        }

        tracing::info!(key, size, bucket = %self.bucket, "uploaded object to cloud storage");
        Ok(self.public_url(key))
    }

    async fn download(&self, key: &str) -> StorageResult<Bytes> {
        check_key(key)?;
        let endpoint = format!("{}/object/{}/{}", self.storage_url, self.bucket, key);
        let response = self.authorized(self.client.get(endpoint)).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status => Err(StorageError::UnexpectedStatus {
                operation: "download",
                status: status.as_u16(),
            }),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        check_key(key)?;
        let endpoint = format!("{}/object/{}", self.storage_url, self.bucket);
        let response = self
            .authorized(self.client.delete(endpoint))
            .json(&serde_json::json!({ "prefixes": [key] }))
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => {
                tracing::info!(key, bucket = %self.bucket, "deleted object from cloud storage");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                tracing::debug!(key, "cloud object already absent");
                Ok(())
            }
            status => Err(StorageError::UnexpectedStatus {
                operation: "delete",
                status: status.as_u16(),
            }),
        }
    }
}
