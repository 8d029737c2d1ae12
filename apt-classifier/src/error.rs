//! Error types for apt-classifier
//!
//! Two layers:
//! - `ClassifyError`: per-record pipeline failures, each with a fixed
//!   recovery policy (skip, fall back, repair, retry)
//! - `ApiError`: HTTP reporting surface errors rendered as JSON

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Pipeline error taxonomy
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Record identity unusable; skipped, never retried
    #[error("Invalid record {artist_id}: {reason}")]
    InvalidRecord { artist_id: Uuid, reason: String },

    /// Generative or reference service failed or timed out; caller falls
    /// back one strategy tier
    #[error("External service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    /// A profile invariant was violated; repaired by recomputation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store read/write failed; retried with backoff up to the configured attempts
    #[error("Persistence error: {0}")]
    Persistence(#[from] apt_common::Error),

    /// Work-set selection failed; aborts the whole run
    #[error("Selection error: {0}")]
    Selection(String),
}

impl ClassifyError {
    pub fn invalid_record(artist_id: Uuid, reason: impl Into<String>) -> Self {
        ClassifyError::InvalidRecord {
            artist_id,
            reason: reason.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        ClassifyError::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Only store failures are retried; every other error has its own recovery
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassifyError::Persistence(_))
    }

    /// Store busy/locked rather than a failure that will likely repeat
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifyError::Persistence(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for ClassifyError {
    fn from(err: sqlx::Error) -> Self {
        ClassifyError::Persistence(apt_common::Error::Database(err))
    }
}

impl From<serde_json::Error> for ClassifyError {
    fn from(err: serde_json::Error) -> Self {
        ClassifyError::Persistence(apt_common::Error::corrupt("profile JSON", err))
    }
}

/// Result alias for pipeline operations
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline error surfaced through a handler
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// apt-common error
    #[error("Common error: {0}")]
    Common(#[from] apt_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Classify(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CLASSIFY_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
