//! # Issuance Guard
//!
//! Middleware in front of the credential issuance endpoint. The caller must
//! present the configured issuance secret in `X-API-Key`; the comparison is
//! constant-time. With no secret configured, issuance is disabled and every
//! request is refused.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::SecretToken;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Issuance configuration injected into request extensions.
#[derive(Clone, Debug)]
pub struct IssuanceConfig {
    pub key: Option<SecretToken>,
}

/// Body of every non-200 issuance response.
#[derive(Debug, Serialize, Deserialize)]
pub struct IssuanceFailure {
    pub success: bool,
    pub error: String,
}

impl IssuanceFailure {
    pub fn response(status: StatusCode, message: &str) -> Response {
        let body = Self {
            success: false,
            error: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Constant-time comparison of shared secrets.
///
/// When lengths differ, a dummy comparison keeps timing independent of
/// where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

pub async fn issuance_guard(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<IssuanceConfig>()
        .and_then(|c| c.key.clone());

    let Some(expected) = expected else {
        tracing::warn!("issuance refused: no issuance key configured");
        return IssuanceFailure::response(StatusCode::FORBIDDEN, "issuance is disabled");
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(provided) if constant_time_token_eq(provided, expected.expose()) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!("issuance refused: invalid API key");
            IssuanceFailure::response(StatusCode::FORBIDDEN, "invalid API key")
        }
        None => {
            tracing::warn!("issuance refused: missing API key");
            IssuanceFailure::response(StatusCode::FORBIDDEN, "missing API key")
        }
    }
}
