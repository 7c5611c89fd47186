//! # Request Metrics
//!
//! In-process atomic counters, mirrored to the `metrics` facade as
//! `visor_http_requests_total{status}` so a Prometheus recorder can export
//! them when one is installed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Process-local request counters, shared across clones.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    /// Requests seen.
    pub request_count: Arc<AtomicU64>,
    /// Responses with a 4xx or 5xx status.
    pub error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests seen so far.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx or 5xx status.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let api_metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;
    let status = response.status();

    if let Some(m) = api_metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() || status.is_server_error() {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }
    ::metrics::counter!("visor_http_requests_total", "status" => status.as_u16().to_string())
        .increment(1);

    response
}
