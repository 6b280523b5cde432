use actix_web::web;

use crate::modules::file_upload::handle::*;

const FILE_ID: &str = "/{file_id:[0-9a-fA-F-]{36}}";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/files")
            .service(web::resource("").route(web::get().to(list_files)))
            .service(
                web::resource("/upload/{mode}")
                    .route(web::post().to(upload_file)),
            )
            .service(
                web::resource("/bulk-delete")
                    .route(web::post().to(bulk_delete)),
            )
            .service(
                web::resource(FILE_ID)
                    .route(web::get().to(get_file))
                    .route(web::delete().to(delete_file)),
            )
            .service(
                web::resource(format!("{FILE_ID}/download"))
                    .route(web::get().to(download_file)),
            ),
    );
}
