//! # visor-api — HTTP Service for the Visor Report Viewer
//!
//! Issues short-lived access links to pathology reports and serves the
//! reports behind them. Every protected request carries a credential minted
//! by `visor-token`; the [`gate::AccessGate`] decides what it unlocks.
//!
//! ## API Surface
//!
//! | Route                              | Module                     |
//! |------------------------------------|----------------------------|
//! | `POST /api/access-token/`          | [`routes::issuance`]       |
//! | `GET /api/validate-access/`        | [`routes::validation`]     |
//! | `GET /api/reports/`                | [`routes::reports`]        |
//! | `GET /api/pdf/v2/{credential}/`    | [`routes::documents`]      |
//! | `GET /health/liveness`, `/health/readiness`, `/metrics` | this module |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → [IssuanceGuard on issuance only] → Handler
//! ```

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::IssuanceConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` sit outside the request counters.
pub fn app(state: AppState) -> Router {
    let issuance = IssuanceConfig {
        key: state.issuance_key.clone(),
    };

    let api = Router::new()
        .merge(routes::issuance::router())
        .merge(routes::validation::router())
        .merge(routes::reports::router())
        .merge(routes::documents::router())
        .layer(axum::Extension(issuance))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(axum::Extension(ApiMetrics::new()))
        .layer(middleware::tracing_layer::layer())
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}

/// Prometheus text exposition, when a recorder is installed.
async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
