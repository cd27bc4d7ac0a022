use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::config::UploadConfig;
use common::storage::BlobKey;
use common::transcode::{normalized_extension, transcode};
use tracing::{debug, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::multipart::AppMultipart;
use crate::models::image::UploadResponse;
use crate::state::AppState;

/// Multipart field carrying the file.
pub const IMAGE_FIELD: &str = "image";

/// Key prefix for uploaded images in the object store.
pub const KEY_PREFIX: &str = "images";

/// Slack for multipart boundaries and part headers on top of the file limit.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Body limit for the upload route. The streaming check in
/// [`receive_image`] enforces the real file limit; this only keeps axum's
/// default 2 MB cap out of the way.
pub fn upload_body_limit(config: &UploadConfig) -> DefaultBodyLimit {
    let limit = config.max_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// A validated file part, fully received.
struct ReceivedImage {
    bytes: Vec<u8>,
    content_type: String,
    filename: String,
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Images",
    operation_id = "uploadImage",
    summary = "Upload an image",
    description = "Accepts one file in the `image` multipart field. The declared part content type \
        must be JPEG, PNG, WebP or SVG. Raster images are shrunk to fit the configured bounding box \
        and re-encoded as JPEG; SVG is stored unchanged. Returns the public URL to embed in a record.",
    request_body(content_type = "multipart/form-data", description = "Form with an `image` file field"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Not multipart, missing field, disallowed type, oversized or undecodable file", body = ErrorBody),
        (status = 500, description = "Processing or storage failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    AppMultipart(mut multipart): AppMultipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = &state.config.upload;
    let mut received: Option<ReceivedImage> = None;

    debug!(stage = "receiving", "Reading multipart body");
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue; // Ignore unknown fields.
        }
        if received.is_some() {
            return Err(AppError::Validation(
                "Only one image may be uploaded per request".into(),
            ));
        }
        received = Some(receive_image(field, upload).await?);
    }

    let ReceivedImage {
        bytes,
        content_type,
        filename,
    } = received.ok_or_else(|| AppError::Validation(format!("Missing '{IMAGE_FIELD}' field")))?;

    debug!(
        stage = "transcoding",
        input_size = bytes.len(),
        content_type = %content_type,
        "Transcoding image"
    );
    let opts = state.config.transcode.clone();
    let transcoded = tokio::task::spawn_blocking(move || transcode(&bytes, &content_type, &opts))
        .await
        .map_err(|e| AppError::Processing(format!("transcode task failed: {e}")))??;

    let key = BlobKey::generate(
        KEY_PREFIX,
        &filename,
        normalized_extension(&transcoded.content_type),
    );
    debug!(stage = "storing", key = %key, size = transcoded.bytes.len(), "Storing image");
    let stored = state
        .objects
        .put(
            &key,
            &transcoded.bytes,
            &transcoded.content_type,
            upload.cache_max_age,
        )
        .await?;

    debug!(stage = "responding", url = %stored.url, "Upload complete");
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: stored.url,
            pathname: stored.pathname,
            content_type: stored.content_type,
            size: transcoded.bytes.len() as u64,
        }),
    ))
}

/// Validate the part's declared type, then read it chunk by chunk, aborting
/// as soon as the running total passes the limit.
async fn receive_image(
    mut field: Field<'_>,
    config: &UploadConfig,
) -> Result<ReceivedImage, AppError> {
    debug!(stage = "validating", "Checking declared content type");
    let declared = field.content_type().unwrap_or_default().to_string();
    let content_type = config.accept(&declared).ok_or_else(|| {
        AppError::Validation(format!(
            "Unsupported file type '{declared}'. Allowed: {}",
            config.allowed_types.join(", ")
        ))
    })?;
    let filename = field.file_name().unwrap_or(IMAGE_FIELD).to_string();

    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (bytes.len() + chunk.len()) as u64 > config.max_size {
            // Dropping the field abandons the rest of the stream.
            return Err(AppError::Validation(format!(
                "File exceeds maximum size of {} bytes",
                config.max_size
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    Ok(ReceivedImage {
        bytes,
        content_type,
        filename,
    })
}
