use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::retry::RetryError;
use common::storage::StorageError;
use common::transcode::TranscodeError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::records::RecordStoreError;

/// Error envelope returned by all endpoints on failure.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    #[schema(example = "File exceeds maximum size of 10485760 bytes")]
    pub error: String,
    /// Extra context for server-side failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "object store unavailable: put images/1-cat-x.jpg: HTTP 503")]
    pub details: Option<String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Bad input from the client. The message is returned verbatim.
    Validation(String),
    NotFound(String),
    /// Write conflict that survived the local retry budget.
    Conflict(String),
    /// Image decoding/encoding failed after validation passed.
    Processing(String),
    /// The object store could not be reached or refused the request.
    StoreUnavailable(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    details: None,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: msg,
                    details: None,
                },
            ),
            AppError::Conflict(detail) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error: "Record was modified concurrently".into(),
                    details: Some(detail),
                },
            ),
            AppError::Processing(detail) => {
                tracing::error!("Image processing failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Image processing failed".into(),
                        details: Some(detail),
                    },
                )
            }
            AppError::StoreUnavailable(detail) => {
                tracing::error!("Object store unavailable: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Storage unavailable".into(),
                        details: Some(detail),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "An unexpected error occurred".into(),
                        details: None,
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {key}")),
            other @ StorageError::Unavailable(_) => AppError::StoreUnavailable(other.to_string()),
            StorageError::Io(e) => AppError::StoreUnavailable(format!("storage IO error: {e}")),
        }
    }
}

impl From<TranscodeError> for AppError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::UnsupportedFormat(msg) => {
                AppError::Validation(format!("Unsupported image content: {msg}"))
            }
            TranscodeError::Processing(msg) => AppError::Processing(msg),
        }
    }
}

impl From<RecordStoreError> for AppError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::NotFound => AppError::NotFound("Record not found".into()),
            RecordStoreError::WriteConflict => AppError::Conflict("write conflict".into()),
            RecordStoreError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<RetryError<RecordStoreError>> for AppError {
    fn from(err: RetryError<RecordStoreError>) -> Self {
        if err.exhausted {
            tracing::warn!(attempts = err.attempts, "Write conflict retries exhausted");
            return AppError::Conflict(format!(
                "update failed after {} attempts: {}",
                err.attempts, err.last
            ));
        }
        err.last.into()
    }
}
