//! # Document Retrieval
//!
//! `GET /api/pdf/v2/{credential}/` serves one rendered report. The subject
//! and document reference come only from the document credential in the
//! path. Any credential failure is the same 400; store and renderer
//! failures are 503.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use visor_token::Purpose;

use crate::audit::{AccessEvent, AuditAction, ClientInfo};
use crate::error::AppError;
use crate::gate::AuthOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pdf/v2/{credential}/", get(get_document))
        .layer(CorsLayer::permissive())
}

async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(credential): Path<String>,
) -> Result<Response, AppError> {
    let outcome = state.gate.authorize(Some(&credential), Purpose::Document);
    state.audit.record(AccessEvent::new(
        AuditAction::DocumentView,
        &outcome,
        Some(&credential),
        &ClientInfo::from_headers(&headers),
    ));
    let AuthOutcome::Valid(authorized) = outcome else {
        return Err(AppError::LinkInvalid);
    };
    let Some(document_ref) = authorized.document_ref else {
        return Err(AppError::LinkInvalid);
    };

    let report = state
        .reports
        .fetch(&authorized.subject, &document_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("report not found".into()))?;

    let renderer = state.renderer.clone();
    let document = tokio::task::spawn_blocking(move || renderer.render(&report))
        .await
        .map_err(|e| AppError::Internal(format!("render task failed: {e}")))??;

    let disposition = format!("inline; filename=\"{}\"", document.filename(&document_ref));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(format!("content disposition: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(document.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, no-store")),
        ],
        document.body,
    )
        .into_response())
}
