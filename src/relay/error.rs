//! Relay error taxonomy and its mapping onto client responses.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::http::response::error_body;

/// Why a single upstream attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptFailure {
    /// The upstream answered with a retryable (5xx) status.
    #[error("upstream answered {status}")]
    Status { status: u16, preview: String },

    /// Connection refused/reset, DNS failure, body read failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("attempt timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

impl AttemptFailure {
    /// Short label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AttemptFailure::Status { .. } => "server_error",
            AttemptFailure::Transport { .. } => "transport_error",
            AttemptFailure::TimedOut { .. } => "timeout",
        }
    }
}

/// Errors raised while relaying one request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Required configuration is missing; no upstream call was made.
    #[error("server misconfigured: {0}")]
    Misconfigured(&'static str),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("request body exceeds the configured limit: {0}")]
    PayloadTooLarge(String),

    /// Every allowed attempt failed with a retryable failure.
    #[error("upstream failed after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: AttemptFailure },

    /// Anything unexpected, including panics caught at the top of the stack.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::RetriesExhausted { .. } => StatusCode::BAD_GATEWAY,
            RelayError::Internal(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Machine-readable code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Misconfigured(_) => "server_misconfigured",
            RelayError::InvalidBody(_) => "invalid_json",
            RelayError::PayloadTooLarge(_) => "payload_too_large",
            RelayError::RetriesExhausted { .. } => "upstream_unavailable",
            RelayError::Internal(_) => "internal_error",
        }
    }
}

impl From<BytesRejection> for RelayError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RelayError::PayloadTooLarge(rejection.body_text())
        } else {
            RelayError::InvalidBody(rejection.body_text())
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut body = error_body(self.code(), &self.to_string());
        if let RelayError::RetriesExhausted { attempts, last } = &self {
            body["attempts"] = json!(attempts);
            body["last_failure"] = json!(last);
        }
        (self.status(), axum::Json(body)).into_response()
    }
}
