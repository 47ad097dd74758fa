//! API error type with structured JSON responses.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, bool) {
        let err = match self {
            ApiError::BadRequest(detail) => {
                return (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone(), false)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    false,
                );
            }
            ApiError::Pipeline(err) => err,
        };

        let retryable = err.is_retryable();
        let (status, code) = match err {
            PipelineError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            PipelineError::DuplicateEmail(_) => (StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
            PipelineError::DuplicateIntake { .. } => (StatusCode::CONFLICT, "DUPLICATE_INTAKE"),
            PipelineError::DuplicateDocument { .. } => (StatusCode::CONFLICT, "DUPLICATE_DOCUMENT"),
            PipelineError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            PipelineError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            PipelineError::InconsistentState(_) => (StatusCode::CONFLICT, "INCONSISTENT_STATE"),
            PipelineError::ClassificationFailure { .. } => {
                (StatusCode::BAD_GATEWAY, "CLASSIFICATION_FAILURE")
            }
            PipelineError::ExtractionFailure { .. } => (StatusCode::BAD_GATEWAY, "EXTRACTION_FAILURE"),
            PipelineError::Database(_) | PipelineError::Blob(_) => {
                tracing::error!(error = %err, "Storage failure while serving request");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    false,
                );
            }
        };
        (status, code, err.to_string(), retryable)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable) = self.parts();
        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                retryable,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                ApiError::Pipeline(PipelineError::Validation(e.body_text()))
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::Pipeline(PipelineError::Validation(
                "upload exceeds the configured size limit".into(),
            ))
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}
