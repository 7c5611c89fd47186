//! # Report Listing
//!
//! `GET /api/reports/?token=` lists the reports of the subject named by an
//! access credential. Each entry carries a freshly minted document link, so
//! the front end never sees a subject or biopsy number in a URL.

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use visor_token::{Grant, Purpose};

use crate::audit::{AccessEvent, AuditAction, ClientInfo};
use crate::error::AppError;
use crate::gate::AuthOutcome;
use crate::routes::token_param;
use crate::state::AppState;

/// One row of the listing, keyed the way the front end expects.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportEntry {
    /// 1-based position in the listing.
    pub id: usize,
    pub numero_biopsia: String,
    pub nombre: String,
    pub rut: String,
    pub servicio: String,
    pub medico: String,
    /// `dd/mm/YYYY HH:MM`, or empty when the report has no validation date.
    pub fecha: String,
    pub url: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/reports/", get(list_reports))
}

async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<ReportEntry>>, AppError> {
    let token = token_param(query.as_deref());
    let outcome = state.gate.authorize(token.as_deref(), Purpose::Access);
    state.audit.record(AccessEvent::new(
        AuditAction::Listing,
        &outcome,
        token.as_deref(),
        &ClientInfo::from_headers(&headers),
    ));
    let AuthOutcome::Valid(authorized) = outcome else {
        return Err(AppError::Unauthorized);
    };

    let summaries = state.reports.list_for_subject(&authorized.subject).await?;
    let base_url = state.base_url(&headers);

    let entries = summaries
        .into_iter()
        .enumerate()
        .map(|(i, summary)| {
            let url = match state
                .codec
                .encode(&Grant::document(summary.subject.clone(), summary.document_ref.clone()))
            {
                Ok(credential) => {
                    metrics::counter!(
                        "visor_credentials_issued_total",
                        "purpose" => Purpose::Document.as_str()
                    )
                    .increment(1);
                    Some(AppState::document_link(&base_url, credential.as_str()))
                }
                Err(err) => {
                    tracing::warn!(error = %err, "report row without a usable document link");
                    None
                }
            };
            ReportEntry {
                id: i + 1,
                fecha: summary.validated_display(),
                numero_biopsia: summary.document_ref,
                nombre: summary.patient_name,
                rut: summary.subject,
                servicio: summary.service,
                medico: summary.physician,
                url,
            }
        })
        .collect();

    Ok(Json(entries))
}
