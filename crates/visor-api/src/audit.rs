//! # Access Audit Trail
//!
//! One [`AccessEvent`] per gate decision on a protected endpoint, kept in a
//! bounded in-memory ring and mirrored to the `visor::audit` tracing target.
//! Raw credentials are never stored; events carry a fingerprint instead.

use std::collections::VecDeque;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;
use visor_token::fingerprint;

use crate::gate::{AuthOutcome, OutcomeKind};

/// Events retained before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Which protected operation the credential was presented to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Access link validation.
    Access,
    /// Document retrieval.
    DocumentView,
    /// Report listing.
    Listing,
}

impl AuditAction {
    /// Stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::DocumentView => "document_view",
            Self::Listing => "listing",
        }
    }
}

/// Caller details taken from request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client address as reported by the proxy.
    pub ip: Option<String>,
    /// Raw `User-Agent` header.
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// First hop of `X-Forwarded-For`, else `X-Real-IP`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        let ip = header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header_str("x-real-ip"))
            .map(str::to_owned);
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Self { ip, user_agent }
    }
}

/// One recorded gate decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the decision was made.
    pub at: DateTime<Utc>,
    /// Endpoint the credential was presented to.
    pub action: AuditAction,
    /// Gate outcome class.
    pub outcome: OutcomeKind,
    /// Set only when the outcome is `ok`.
    pub subject: Option<String>,
    /// Set only when the outcome is `ok` and the credential names a document.
    pub document_ref: Option<String>,
    /// Fingerprint of the presented credential, if any.
    pub fingerprint: Option<String>,
    /// See [`ClientInfo::ip`].
    pub client_ip: Option<String>,
    /// See [`ClientInfo::user_agent`].
    pub user_agent: Option<String>,
}

impl AccessEvent {
    /// Build an event stamped now. `credential` is only fingerprinted.
    pub fn new(
        action: AuditAction,
        outcome: &AuthOutcome,
        credential: Option<&str>,
        client: &ClientInfo,
    ) -> Self {
        let authorized = outcome.authorized();
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            action,
            outcome: outcome.kind(),
            subject: authorized.map(|a| a.subject.clone()),
            document_ref: authorized.and_then(|a| a.document_ref.clone()),
            fingerprint: credential
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(fingerprint),
            client_ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        }
    }
}

/// Bounded, shared audit ring. Oldest events are dropped first.
#[derive(Debug, Clone)]
pub struct AuditLog {
    events: Arc<Mutex<VecDeque<AccessEvent>>>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AuditLog {
    /// Ring holding at most `capacity` events (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    /// Store `event` and emit it on the `visor::audit` target.
    pub fn record(&self, event: AccessEvent) {
        match event.outcome {
            OutcomeKind::Ok => tracing::info!(
                target: "visor::audit",
                id = %event.id,
                action = event.action.as_str(),
                outcome = event.outcome.as_str(),
                fingerprint = event.fingerprint.as_deref().unwrap_or("-"),
                client_ip = event.client_ip.as_deref().unwrap_or("-"),
                "access granted"
            ),
            _ => tracing::warn!(
                target: "visor::audit",
                id = %event.id,
                action = event.action.as_str(),
                outcome = event.outcome.as_str(),
                fingerprint = event.fingerprint.as_deref().unwrap_or("-"),
                client_ip = event.client_ip.as_deref().unwrap_or("-"),
                "access denied"
            ),
        }

        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Up to `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AccessEvent> {
        self.events.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
