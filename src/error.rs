//! Error types for the key-value server
//!
//! Provides unified request error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == KV Error Enum ==
/// Outcome of a request that did not succeed.
///
/// Only `Backend` is a system fault; the rest are normal client-facing
/// outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KvError {
    /// Malformed or missing input, rejected before any cache or database access
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key is not present in the database
    #[error("Not found: {0}")]
    NotFound(String),

    /// Key already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database unavailable or statement failed
    #[error("Backend failure: {0}")]
    Backend(String),
}

impl KvError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            KvError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            KvError::NotFound(_) => StatusCode::NOT_FOUND,
            KvError::Conflict(_) => StatusCode::CONFLICT,
            KvError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message carried in the response body.
    pub fn message(&self) -> &str {
        match self {
            KvError::InvalidRequest(msg)
            | KvError::NotFound(msg)
            | KvError::Conflict(msg)
            | KvError::Backend(msg) => msg,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for KvError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message()
        }));

        (self.status(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for request handling.
pub type Result<T> = std::result::Result<T, KvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            KvError::InvalidRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(KvError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(KvError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            KvError::Backend("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = KvError::Conflict("Key already exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Key already exists");
    }
}
