//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Credential failures map to fixed client messages regardless of cause;
//! upstream and internal failures are logged and never described to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use visor_report::ReportError;

/// Client-facing message for every rejected document link.
pub const LINK_INVALID_MESSAGE: &str = "link invalid or expired";

/// Client-facing message for every rejected access credential.
pub const TOKEN_INVALID_MESSAGE: &str = "invalid or expired token";

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error payload.
    pub error: ErrorDetail,
}

/// Code, message and optional details of one error.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "LINK_INVALID").
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Extra context, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Access credential absent, expired or invalid (401).
    #[error("invalid or expired token")]
    Unauthorized,

    /// Document credential absent, expired or invalid (400).
    #[error("link invalid or expired")]
    LinkInvalid,

    /// Report store or renderer failed (503). Detail is logged only.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Internal server error (500). Detail is logged only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::LinkInvalid => (StatusCode::BAD_REQUEST, "LINK_INVALID"),
            Self::UpstreamUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::UpstreamUnavailable(detail) => {
                tracing::error!(error = %detail, "upstream failure");
                "report service unavailable".to_string()
            }
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}
