use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use common::storage::cache_control_value;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::image::{DeleteImageRequest, DeleteImageResponse};
use crate::state::AppState;

#[utoipa::path(
    delete,
    path = "/image",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Delete an image by URL",
    description = "Deletes the image identified by its public URL or pathname. Deleting an image \
        that no longer exists succeeds.",
    request_body = DeleteImageRequest,
    responses(
        (status = 200, description = "Image deleted", body = DeleteImageResponse),
        (status = 400, description = "URL is not served by this store", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(url = %payload.url))]
pub async fn delete_image(
    State(state): State<AppState>,
    AppJson(payload): AppJson<DeleteImageRequest>,
) -> Result<Json<DeleteImageResponse>, AppError> {
    delete_by_reference(&state, payload.url).await
}

#[utoipa::path(
    delete,
    path = "/api/image/{url}",
    tag = "Images",
    operation_id = "deleteImageByPath",
    summary = "Delete an image by URL path parameter",
    description = "Same as `DELETE /api/image`, with the (percent-encoded) URL or pathname in the path.",
    params(("url" = String, Path, description = "Public URL or pathname of the image")),
    responses(
        (status = 200, description = "Image deleted", body = DeleteImageResponse),
        (status = 400, description = "URL is not served by this store", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_image_by_path(
    State(state): State<AppState>,
    Path(url): Path<String>,
) -> Result<Json<DeleteImageResponse>, AppError> {
    delete_by_reference(&state, url).await
}

async fn delete_by_reference(
    state: &AppState,
    url: String,
) -> Result<Json<DeleteImageResponse>, AppError> {
    let url = url.trim().to_string();
    if url.is_empty() {
        return Err(AppError::Validation("url must not be empty".into()));
    }
    state.objects.delete(&url).await?;
    Ok(Json(DeleteImageResponse { deleted: url }))
}

/// Serve an object from stores that keep their bytes locally.
#[instrument(skip(state))]
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let blob = state.objects.get(&path).await?;

    let content_type = if blob.content_type == "application/octet-stream" {
        mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string()
    } else {
        blob.content_type
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, blob.bytes.len().to_string())
        .header(header::CACHE_CONTROL, cache_control_value(blob.cache_max_age))
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        // SVG can carry script; never let it run in our origin.
        .header(header::CONTENT_SECURITY_POLICY, "sandbox")
        .body(Body::from(blob.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
