use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    api::error,
    constants::Env,
    modules::file_upload::{
        storage::{cloud::SupabaseConfig, CloudStore, StorageError, SupabaseStore},
        validator::{ContentPolicy, ContentType},
    },
    ENV,
};

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let database_url = &ENV.database_url;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_slow_threshold(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database connected and migrations applied");
    Ok(pool)
}

/// Cloud storage is optional at boot; cloud operations fail until it is configured.
pub fn cloud_store(env: &Env) -> Result<Option<Arc<dyn CloudStore>>, StorageError> {
    let (Some(url), Some(key)) = (&env.supabase_url, &env.supabase_key) else {
        tracing::warn!("SUPABASE_URL or SUPABASE_KEY missing, cloud storage disabled");
        return Ok(None);
    };

    let store = SupabaseStore::new(SupabaseConfig {
        url: url.clone(),
        key: key.clone(),
        bucket: env.supabase_bucket.clone(),
        timeout: Duration::from_secs(env.cloud_timeout_secs),
    })?;
    tracing::info!(bucket = %env.supabase_bucket, "cloud storage configured");
    Ok(Some(Arc::new(store)))
}

pub fn content_policy(env: &Env) -> ContentPolicy {
    let mut policy = ContentPolicy::default();
    if let Some(allowed) = &env.allowed_file_types {
        policy = policy.with_allowed(allowed.as_slice());
    }
    for (content_type, ceiling) in [
        (ContentType::Jpeg, env.max_jpeg_bytes),
        (ContentType::Png, env.max_png_bytes),
        (ContentType::Pdf, env.max_pdf_bytes),
    ] {
        if let Some(max_bytes) = ceiling {
            policy = policy.with_ceiling(content_type, max_bytes);
        }
    }
    policy
}
