use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "storage_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    Cloud,
    Both,
}

impl StorageMode {
    pub fn has_local(&self) -> bool {
        matches!(self, StorageMode::Local | StorageMode::Both)
    }

    pub fn has_cloud(&self) -> bool {
        matches!(self, StorageMode::Cloud | StorageMode::Both)
    }
}

impl std::str::FromStr for StorageMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(StorageMode::Local),
            "cloud" => Ok(StorageMode::Cloud),
            "both" => Ok(StorageMode::Both),
            _ => Err(()),
        }
    }
}

/// File metadata entity from database
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntity {
    pub id: Uuid,
    pub stored_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub local_path: Option<String>,
    pub cloud_url: Option<String>,
    pub storage_mode: StorageMode,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
