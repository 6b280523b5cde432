use actix_cors::Cors;
use actix_web::{
    self, http,
    middleware::{from_fn, DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer,
};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::{
    configs::{cloud_store, connect_database, content_policy, init_tracing},
    middlewares::{rate_limit, RateLimiter},
    modules::file_upload::{storage::DiskStore, FilePgRepository, FileUploadService},
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    constants::Env::default()
});

#[actix_web::get("/health")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();
    tracing::info!("Environment variables loaded");

    let db_pool = connect_database().await.map_err(|e| {
        tracing::error!(error = %e, "database connection failed");
        std::io::Error::other("Database connection error")
    })?;

    let local_store = DiskStore::new(ENV.upload_dir.as_str()).await.map_err(|e| {
        tracing::error!(error = %e, dir = %ENV.upload_dir, "upload directory unavailable");
        std::io::Error::other("Upload directory error")
    })?;

    let cloud = cloud_store(&ENV).map_err(|e| {
        tracing::error!(error = %e, "cloud storage client could not be built");
        std::io::Error::other("Cloud storage error")
    })?;

    let file_service = FileUploadService::with_dependencies(
        Arc::new(FilePgRepository::new(db_pool)),
        Arc::new(local_store),
        cloud,
        content_policy(&ENV),
    );

    let limiter = Arc::new(RateLimiter::new(
        ENV.rate_limit_max,
        Duration::from_secs(ENV.rate_limit_window_secs),
    ));

    tracing::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::ACCEPT])
            .expose_headers(vec![http::header::CONTENT_DISPOSITION])
            .max_age(3600);

        App::new()
            .wrap(from_fn(rate_limit(limiter.clone())))
            .wrap(cors)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "no-referrer")),
            )
            .wrap(Logger::default())
            .app_data(web::Data::new(file_service.clone()))
            .service(health_check)
            .configure(modules::file_upload::route::configure)
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .run()
    .await
}
