//! API error types for quorum-server
//!
//! Maps the service error taxonomy onto HTTP status codes. Rate-limit
//! rejections carry a `Retry-After` header in whole seconds.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input; rejected before any work starts (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing/invalid session or webhook signature; rejected before any
    /// side effect (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with existing state (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller exceeded a rate-limit window (429)
    #[error("Too many requests")]
    RateLimited { reset_ms: u64 },

    /// Required collaborator is not configured (503)
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Upstream collaborator failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// quorum-common error
    #[error(transparent)]
    Common(#[from] quorum_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Retry-After is expressed in whole seconds, rounded up
        if let ApiError::RateLimited { reset_ms } = self {
            let retry_after_s = reset_ms.div_ceil(1000);
            let body = Json(json!({
                "error": "Too many requests. Please try again later."
            }));
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_s.to_string())],
                body,
            )
                .into_response();
        }

        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Common(err) => match err {
                quorum_common::Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
                quorum_common::Error::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
                quorum_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
                quorum_common::Error::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
                other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            },
            ApiError::RateLimited { .. } => unreachable!("handled above"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
