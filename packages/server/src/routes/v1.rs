use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::blob::{
    __path_delete_blob, __path_download_blob, __path_get_blob_info, __path_list_blobs,
    __path_upload_blobs, delete_blob, download_blob, get_blob_info, list_blobs, upload_blobs,
    upload_body_limit,
};
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/blobs", blob_routes(config))
}

fn blob_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(upload_blobs))
        .layer(upload_body_limit(config.storage.max_upload_size));

    OpenApiRouter::new()
        .routes(routes!(list_blobs))
        .routes(routes!(get_blob_info))
        .routes(routes!(download_blob))
        .routes(routes!(delete_blob))
        .merge(upload)
}
