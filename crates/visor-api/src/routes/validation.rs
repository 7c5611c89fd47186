//! # Access Credential Validation
//!
//! `GET /api/validate-access/?token=` lets the front end check an access
//! link before showing the report list. Every failure looks the same.

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use visor_token::Purpose;

use crate::audit::{AccessEvent, AuditAction, ClientInfo};
use crate::error::TOKEN_INVALID_MESSAGE;
use crate::gate::AuthOutcome;
use crate::routes::token_param;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/validate-access/", get(validate_access))
}

async fn validate_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let token = token_param(query.as_deref());
    let outcome = state.gate.authorize(token.as_deref(), Purpose::Access);
    state.audit.record(AccessEvent::new(
        AuditAction::Access,
        &outcome,
        token.as_deref(),
        &ClientInfo::from_headers(&headers),
    ));

    match outcome {
        AuthOutcome::Valid(authorized) => (
            StatusCode::OK,
            Json(ValidationResponse {
                valid: true,
                rut: Some(authorized.subject),
                error: None,
            }),
        )
            .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(ValidationResponse {
                valid: false,
                rut: None,
                error: Some(TOKEN_INVALID_MESSAGE.to_string()),
            }),
        )
            .into_response(),
    }
}
