pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Body of every error response.
///
/// ```json
/// { "detail": "No user found" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable description of the failure
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Application error type that can be converted to HTTP responses.
///
/// Domain errors convert into one of these variants; `into_response` picks
/// the status code, logs with an [`ErrorCode`] and renders [`ErrorResponse`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail, code) = match self {
            AppError::JsonExtractorRejection(e) => {
                tracing::info!(
                    error_code = ErrorCode::JsonExtraction.code(),
                    "JSON extraction error: {:?}",
                    e
                );
                let status = match e {
                    JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ref other => other.status(),
                };
                (status, e.body_text(), ErrorCode::JsonExtraction)
            }
            AppError::ValidationError(e) => {
                tracing::info!(
                    error_code = ErrorCode::ValidationError.code(),
                    "Validation error: {:?}",
                    e
                );
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    describe_validation_errors(&e),
                    ErrorCode::ValidationError,
                )
            }
            AppError::NotFound(msg) => {
                tracing::info!(error_code = ErrorCode::NotFound.code(), "Not found: {}", msg);
                (StatusCode::NOT_FOUND, msg, ErrorCode::NotFound)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(
                    error_code = ErrorCode::InternalError.code(),
                    "Internal server error: {}",
                    msg
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg,
                    ErrorCode::InternalError,
                )
            }
            AppError::Database(msg) => {
                tracing::error!(
                    error_code = ErrorCode::DatabaseError.code(),
                    "Database error: {}",
                    msg
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg,
                    ErrorCode::DatabaseError,
                )
            }
            AppError::Decode(msg) => {
                tracing::error!(
                    error_code = ErrorCode::DatabaseDecode.code(),
                    "Stored document could not be decoded: {}",
                    msg
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg,
                    ErrorCode::DatabaseDecode,
                )
            }
        };

        error_response(status, detail, code)
    }
}

/// Flatten validation errors into one `field: message` list joined by `; `.
///
/// Fields are sorted by name; struct-level (`__all__`) errors come last.
/// Errors without a message fall back to their code.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<(String, Vec<String>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|err| match &err.message {
                    Some(message) => message.to_string(),
                    None => err.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect();

    fields.sort_by(|(a, _), (b, _)| (a == "__all__", a).cmp(&(b == "__all__", b)));

    fields
        .into_iter()
        .flat_map(|(field, messages)| {
            messages
                .into_iter()
                .map(move |message| format!("{}: {}", field, message))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render an error body with the given status.
///
/// `error_code` is only logged at debug level; clients see `detail`.
pub fn error_response(status: StatusCode, detail: String, error_code: ErrorCode) -> Response {
    tracing::debug!(error_code = error_code.code(), error = %error_code, %status, "Error response");
    (status, Json(ErrorResponse { detail })).into_response()
}
