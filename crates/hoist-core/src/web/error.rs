//! HTTP error handling for the web API.
//!
//! This module provides conversion from core library errors to
//! appropriate HTTP responses with JSON error bodies. The body shape
//! matches [`crate::protocol::ErrorResponse`], which the HTTP transport
//! parses on the client side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::Error;

/// API error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Stable error code (e.g. "E002" for an unknown session)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: Some("E001".into()),
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: Some("E002".into()),
            message: message.into(),
        }
    }

    /// Create a conflict error (operation not valid right now).
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            code: Some("E004".into()),
            message: message.into(),
        }
    }

    /// Create an internal server error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.code.as_deref() {
            Some("E001") => StatusCode::BAD_REQUEST,
            Some("E002") => StatusCode::NOT_FOUND,
            Some("E003") => StatusCode::UNPROCESSABLE_ENTITY,
            Some("E004" | "E005") => StatusCode::CONFLICT,
            Some("E008") => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self {
            code: err.code().map(String::from),
            message: err.to_string(),
        }
    }
}

/// Result type for web handlers.
pub type ApiResult<T> = Result<T, ApiError>;
