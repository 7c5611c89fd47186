//! # Access Credential Issuance
//!
//! `POST /api/access-token/` mints an access credential for one subject and
//! returns it together with the front-end link that carries it. Only callers
//! holding the issuance API key get this far (see [`crate::auth`]).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use visor_token::{fingerprint, Grant, Purpose};

use crate::auth::{issuance_guard, IssuanceFailure};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    #[serde(default)]
    pub rut: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueResponse {
    pub success: bool,
    pub token: String,
    pub url: String,
    pub expires_in_seconds: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/access-token/",
        post(issue_access_token).route_layer(from_fn(issuance_guard)),
    )
}

async fn issue_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "issuance body rejected");
            return IssuanceFailure::response(
                StatusCode::BAD_REQUEST,
                "request body must be JSON with a 'rut' field",
            );
        }
    };

    let subject = match request.rut.as_deref().map(str::trim) {
        Some(rut) if !rut.is_empty() => rut.to_string(),
        _ => return IssuanceFailure::response(StatusCode::BAD_REQUEST, "rut is required"),
    };

    let credential = match state.codec.encode(&Grant::access(subject)) {
        Ok(credential) => credential,
        Err(err) => {
            tracing::error!(error = %err, "failed to mint access credential");
            return IssuanceFailure::response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "could not issue credential",
            );
        }
    };

    metrics::counter!("visor_credentials_issued_total", "purpose" => Purpose::Access.as_str())
        .increment(1);
    tracing::info!(
        fingerprint = %fingerprint(credential.as_str()),
        ttl_secs = state.token_ttl_secs,
        "access credential issued"
    );

    let url = state.access_link(&headers, credential.as_str());
    let body = IssueResponse {
        success: true,
        token: credential.into_string(),
        url,
        expires_in_seconds: state.token_ttl_secs,
    };
    (StatusCode::OK, Json(body)).into_response()
}
