//! API error type and HTTP status mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Boundary error: every service error surfaces here unchanged and maps to
/// exactly one status code.
#[derive(Debug)]
pub enum ApiError {
    Database(chanfind_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
}

impl From<chanfind_core::Error> for ApiError {
    fn from(err: chanfind_core::Error) -> Self {
        match err {
            chanfind_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            chanfind_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            chanfind_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
