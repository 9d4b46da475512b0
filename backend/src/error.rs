//! Error types and error handling for the application
//!
//! This module defines the error type shared by every handler.
//! All errors implement `IntoResponse` to provide consistent error formatting:
//! `{"error": <message>, "status": <code>}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Each variant maps to one of the fixed status codes the API exposes
/// (400, 401, 403, 404, 500).
#[derive(Error, Debug)]
pub enum AppError {
    /// Request failed validation (missing or malformed field)
    #[error("{0}")]
    Validation(String),

    /// Request body could not be parsed as JSON
    #[error("Invalid JSON in request body: {0}")]
    InvalidJson(#[from] JsonRejection),

    /// Caller is not authenticated
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is authenticated but does not own the resource
    #[error("{0}")]
    Forbidden(String),

    /// Requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Required configuration is missing (e.g. no media bucket)
    #[error("{0}")]
    Configuration(String),

    /// Table store failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Object store failure
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Configuration("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_is_surfaced_verbatim() {
        let err = AppError::NotFound("Blog not found".to_string());
        assert_eq!(err.to_string(), "Blog not found");
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::Forbidden("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
