//! Helper types and traits for cleaner route handlers.
//!
//! Every failure leaves the server as the same JSON envelope,
//! `{"error": "<message>"}` with status 500; only the message differs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Error returned by route handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T> {
    /// Converts the error to a 500 carrying the error's own message.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to a 500 with a fixed message; the cause is logged.
    fn or_error(self, message: &str) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| ApiError::internal(e.to_string()))
    }

    fn or_error(self, message: &str) -> RouteResult<T> {
        self.map_err(|e| {
            tracing::error!("{}: {}", message, e);
            ApiError::internal(message)
        })
    }
}
