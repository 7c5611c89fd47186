//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The codec is built once from the configured key and shared read-only.
//! The audit ring is the only mutable structure; its lock is never held
//! across an `.await`.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use metrics_exporter_prometheus::PrometheusHandle;
use visor_report::{DocumentRenderer, HtmlRenderer, ReportStore};
use visor_token::{Clock, SystemClock, TokenCodec};

use crate::audit::AuditLog;
use crate::config::{AppConfig, SecretToken};
use crate::gate::AccessGate;

/// Shared application state. Cheap to clone; all heavy members are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Codec for minting credentials.
    pub codec: Arc<TokenCodec>,
    /// Decodes presented credentials with the configured TTL.
    pub gate: AccessGate,
    /// Report lookup backend.
    pub reports: Arc<dyn ReportStore>,
    /// Document renderer for the v2 document endpoint.
    pub renderer: Arc<dyn DocumentRenderer>,
    /// Access and document-view audit ring.
    pub audit: AuditLog,
    /// Issuance API key; `None` disables issuance.
    pub issuance_key: Option<SecretToken>,
    /// Configured scheme and authority for minted links.
    pub public_base_url: Option<String>,
    /// Front-end path access links point at.
    pub access_link_path: String,
    /// Credential TTL in seconds, shared by both purposes.
    pub token_ttl_secs: i64,
    /// Prometheus render handle when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("codec", &self.codec)
            .field("issuance_key", &self.issuance_key)
            .field("public_base_url", &self.public_base_url)
            .field("access_link_path", &self.access_link_path)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("audit_events", &self.audit.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State on the wall clock with the HTML renderer.
    pub fn new(config: &AppConfig, reports: Arc<dyn ReportStore>) -> Self {
        Self::with_clock(config, reports, Arc::new(SystemClock))
    }

    /// State whose codec reads time from `clock`.
    pub fn with_clock(
        config: &AppConfig,
        reports: Arc<dyn ReportStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::with_clock(&config.token_key, clock));
        Self {
            gate: AccessGate::new(codec.clone(), config.token_ttl_secs),
            codec,
            reports,
            renderer: Arc::new(HtmlRenderer::default()),
            audit: AuditLog::default(),
            issuance_key: config.issuance_key.clone(),
            public_base_url: config.public_base_url.clone(),
            access_link_path: config.access_link_path.clone(),
            token_ttl_secs: config.token_ttl_secs,
            prometheus: None,
        }
    }

    /// Replace the document renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Attach the Prometheus handle served on `/metrics`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Scheme and authority for minted links: the configured public base
    /// URL, else `http://{Host}`, else `http://localhost`.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_base_url {
            return base.clone();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost");
        format!("http://{host}")
    }

    /// `<base><access path>?token=<credential>`.
    pub fn access_link(&self, headers: &HeaderMap, credential: &str) -> String {
        format!(
            "{}{}?token={credential}",
            self.base_url(headers),
            self.access_link_path
        )
    }

    /// `<base>/api/pdf/v2/<credential>/`.
    pub fn document_link(base_url: &str, credential: &str) -> String {
        format!("{base_url}/api/pdf/v2/{credential}/")
    }
}
