use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::retry::{RetryPolicy, retry};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::record::*;
use crate::records::{MAX_LIST_LIMIT, RecordStoreError};
use crate::state::AppState;

fn parse_record_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation("Invalid record ID".into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Records",
    operation_id = "listRecords",
    summary = "List records",
    description = "Returns up to `limit` records (at most 100), newest first.",
    params(RecordListQuery),
    responses(
        (status = 200, description = "Records, newest first", body = Vec<RecordResponse>),
        (status = 400, description = "Malformed query string", body = ErrorBody),
        (status = 500, description = "Record store failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_records(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RecordListQuery>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    let limit = query.limit.unwrap_or(MAX_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let records = state.records.list(limit).await?;
    Ok(Json(records.into_iter().map(RecordResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Records",
    operation_id = "createRecord",
    summary = "Create a record",
    description = "Stores the posted fields as a new record. Client-supplied identifiers and \
        timestamps are ignored; the server assigns them.",
    request_body(content = serde_json::Value, description = "Arbitrary record fields, optionally with `imageUrl` and `imagePath`"),
    responses(
        (status = 201, description = "Record created", body = RecordResponse),
        (status = 400, description = "Body is not a JSON object or has an invalid image reference", body = ErrorBody),
        (status = 500, description = "Record store failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state, body))]
pub async fn create_record(
    State(state): State<AppState>,
    AppJson(body): AppJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    let new = RecordBody::parse(body)?.into_new_record();
    let record = state.records.create(new).await?;
    info!(id = %record.id, "Record created");
    Ok((StatusCode::CREATED, Json(RecordResponse::from(record))))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Records",
    operation_id = "updateRecord",
    summary = "Update a record",
    description = "Merges the posted fields into the record. A `null` field value removes that \
        field. Concurrent writers are detected by version; the update is retried a bounded number \
        of times before giving up with 409.",
    params(("id" = String, Path, description = "Record ID")),
    request_body(content = serde_json::Value, description = "Fields to merge"),
    responses(
        (status = 200, description = "Updated record", body = RecordResponse),
        (status = 400, description = "Invalid record ID or body", body = ErrorBody),
        (status = 404, description = "Record not found", body = ErrorBody),
        (status = 409, description = "Concurrent modification, retries exhausted", body = ErrorBody),
        (status = 500, description = "Record store failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state, body))]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<Value>,
) -> Result<Json<RecordResponse>, AppError> {
    let id = parse_record_id(&id)?;
    let changes = RecordBody::parse(body)?.into_changes();

    if changes.is_empty() {
        let record = state
            .records
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Record not found".into()))?;
        return Ok(Json(record.into()));
    }

    let records = &state.records;
    let changes = &changes;
    let record = retry(
        RetryPolicy::write_conflict(),
        RecordStoreError::is_write_conflict,
        |_| records.update(id, changes),
    )
    .await?;

    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Records",
    operation_id = "deleteRecord",
    summary = "Delete a record",
    description = "Deletes the record, then makes a best-effort attempt to delete its image. A \
        failed image delete is logged and does not fail the request.",
    params(("id" = String, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record deleted", body = DeleteRecordResponse),
        (status = 400, description = "Invalid record ID", body = ErrorBody),
        (status = 404, description = "Record not found", body = ErrorBody),
        (status = 500, description = "Record store failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteRecordResponse>, AppError> {
    let id = parse_record_id(&id)?;
    let record = state
        .records
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Record not found".into()))?;

    // Lost a race with another delete: that request owns the cleanup.
    if !state.records.delete(id).await? {
        return Err(AppError::NotFound("Record not found".into()));
    }

    let image_ref = record
        .image_url
        .as_deref()
        .or(record.image_path.as_deref())
        .filter(|r| !r.is_empty());
    if let Some(image_ref) = image_ref {
        match state.objects.delete(image_ref).await {
            Ok(()) => info!(id = %id, image = %image_ref, "Deleted record image"),
            Err(e) => warn!(id = %id, image = %image_ref, error = %e, "Failed to delete record image"),
        }
    }

    Ok(Json(DeleteRecordResponse { deleted: id }))
}
