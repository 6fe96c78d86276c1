use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::assessment::generator::GenerationError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Attempt {attempt_id} was already submitted")]
    AlreadySubmitted { attempt_id: Uuid },

    #[error("Attempt {attempt_id} has expired")]
    Expired { attempt_id: Uuid },

    #[error("Assessment generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut attempt = None;
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::AlreadySubmitted { attempt_id } => {
                attempt = Some(*attempt_id);
                (
                    StatusCode::CONFLICT,
                    "ALREADY_SUBMITTED",
                    "This test has already been submitted".to_string(),
                )
            }
            AppError::Expired { attempt_id } => {
                attempt = Some(*attempt_id);
                (
                    StatusCode::CONFLICT,
                    "ATTEMPT_EXPIRED",
                    "The time limit for this test has passed".to_string(),
                )
            }
            AppError::Generation(GenerationError::UpstreamUnavailable(msg)) => {
                tracing::error!("LLM unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "LLM_UNAVAILABLE",
                    "The question generator is unavailable, please upload again shortly"
                        .to_string(),
                )
            }
            AppError::Generation(e) => {
                tracing::error!("LLM output rejected: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_INVALID_OUTPUT",
                    "The question generator returned an unusable response, please upload again"
                        .to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(attempt_id) = attempt {
            error["attempt_id"] = json!(attempt_id);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
