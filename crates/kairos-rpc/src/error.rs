//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kairos_scheduler::IntakeError;
use serde::Serialize;
use thiserror::Error;

/// Errors from running the server itself
#[derive(Debug, Error)]
pub enum RpcError {
    /// Failed to bind or serve
    #[error("server error: {0}")]
    Bind(#[from] std::io::Error),
}

/// Result type for server operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Error body returned by every route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Error class
    pub error: &'static str,
    /// Human-readable detail
    pub message: String,
}

/// A failed request
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or query did not parse
    #[error("{0}")]
    Validation(String),

    /// Intake refused or failed the operation
    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl ApiError {
    /// Validation failure with a message
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Intake(IntakeError::Window(_)) => (StatusCode::BAD_REQUEST, "TimeRangeError"),
            ApiError::Intake(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Intake(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_scheduler::WindowError;
    use kairos_types::ChainId;

    #[test]
    fn test_status_mapping() {
        let window = ApiError::from(IntakeError::Window(WindowError::MalformedInput("short".into())));
        assert_eq!(window.status_and_kind(), (StatusCode::BAD_REQUEST, "TimeRangeError"));

        let chain = ApiError::from(IntakeError::ChainNotPolled(ChainId::Base));
        assert_eq!(chain.status_and_kind(), (StatusCode::BAD_REQUEST, "ValidationError"));

        let bad = ApiError::validation("missing sender");
        assert_eq!(bad.status_and_kind().0, StatusCode::BAD_REQUEST);
    }
}
