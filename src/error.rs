//! Error types for the math service
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Persistence Error ==
/// The durable request log could not be written or read.
///
/// This is the only failure a computation can end with.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database rejected the statement
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database file or directory could not be prepared
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store did not answer in time
    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking task running the statement panicked or was cancelled
    #[error("database task failed: {0}")]
    Task(String),

    /// A previous panic left the connection lock poisoned
    #[error("database connection lock poisoned")]
    Poisoned,

    /// A stored row could not be decoded
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The username is already taken
    #[error("user '{0}' already exists")]
    DuplicateUser(String),
}

// == API Error Enum ==
/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed query parameters
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing, malformed or expired bearer token
    #[error("{0}")]
    Unauthorized(String),

    /// The request log could not be persisted
    #[error("Failed to record request: {0}")]
    Persistence(#[from] PersistenceError),

    /// Any other server-side failure; details stay in the log
    #[error("{0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Persistence(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "msg": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
