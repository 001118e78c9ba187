use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::screening::FileFailure;
use crate::screening::pipeline::ScreeningError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// No uploaded file produced a candidate; nothing was persisted.
    #[error("No processable files")]
    NoProcessableFiles(Vec<FileFailure>),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<ScreeningError> for AppError {
    fn from(e: ScreeningError) -> Self {
        match e {
            ScreeningError::InvalidBatch(msg) => AppError::InvalidBatch(msg),
            ScreeningError::NoProcessableFiles(failures) => AppError::NoProcessableFiles(failures),
            ScreeningError::Persistence(e) => AppError::Persistence(e),
            ScreeningError::NotFound(id) => AppError::NotFound(format!("Screening job {id} not found")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidBatch(msg) => (StatusCode::BAD_REQUEST, "INVALID_BATCH", msg.clone()),
            AppError::NoProcessableFiles(failures) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_PROCESSABLE_FILES",
                format!("None of the {} uploaded file(s) could be processed", failures.len()),
            ),
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "The screening run could not be saved".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        if let AppError::NoProcessableFiles(failures) = &self {
            body["failures"] = json!(failures);
        }

        (status, Json(body)).into_response()
    }
}
