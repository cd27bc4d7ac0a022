use axum::routing::{delete, get};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

/// Routes mounted under `/api`.
pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_image))
        .layer(handlers::upload::upload_body_limit(&config.upload));

    // Wildcard paths are registered on the plain router; the OpenAPI entry
    // for the by-path delete is listed in `ApiDoc`.
    let images = OpenApiRouter::new()
        .routes(routes!(handlers::image::delete_image))
        .route(
            "/image/{*url}",
            delete(handlers::image::delete_image_by_path),
        );

    upload.merge(images)
}

/// Routes mounted under `/data`.
pub fn data_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::record::list_records,
            handlers::record::create_record
        ))
        .routes(routes!(
            handlers::record::update_record,
            handlers::record::delete_record
        ))
}

/// Blob serving for stores that keep bytes locally.
pub fn blob_routes() -> axum::Router<AppState> {
    axum::Router::new().route("/blobs/{*path}", get(handlers::image::serve_blob))
}
