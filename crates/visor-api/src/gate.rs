//! # Access Gate
//!
//! The request-time check in front of every credential-protected endpoint.
//!
//! ## Outcomes
//!
//! | Outcome   | Cause                                           |
//! |-----------|-------------------------------------------------|
//! | `Absent`  | no credential, or only whitespace               |
//! | `Valid`   | authentic, fresh, and of the expected purpose   |
//! | `Expired` | authentic but older than the TTL, or from the future |
//! | `Invalid` | malformed, tampered, or minted for another purpose |
//!
//! Every non-valid outcome is kept distinct for logs, metrics and the audit
//! trail, but handlers present all of them to clients as one response.

use std::sync::Arc;

use serde::Serialize;
use visor_token::{fingerprint, Purpose, TokenCodec, TokenError};

/// What a valid credential releases to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    /// Patient identifier the credential is bound to.
    pub subject: String,
    /// Present for `document` credentials only.
    pub document_ref: Option<String>,
}

/// Result of one gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// No credential was presented.
    Absent,
    /// Authentic, fresh and of the expected purpose.
    Valid(Authorized),
    /// The decode error is retained for logging only.
    Invalid(TokenError),
    /// Authentic but outside the accepted age window.
    Expired {
        /// Seconds since issuance; negative for future issue times.
        age: i64,
    },
}

/// Outcome class without any payload, for metrics labels and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Credential accepted.
    Ok,
    /// No credential.
    Absent,
    /// Malformed, tampered or wrong purpose.
    Invalid,
    /// Outside the TTL window.
    Expired,
}

impl OutcomeKind {
    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Absent => "absent",
            Self::Invalid => "invalid",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthOutcome {
    /// Payload-free class of this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Absent => OutcomeKind::Absent,
            Self::Valid(_) => OutcomeKind::Ok,
            Self::Invalid(_) => OutcomeKind::Invalid,
            Self::Expired { .. } => OutcomeKind::Expired,
        }
    }

    /// The released identity, only for `Valid`.
    pub fn authorized(&self) -> Option<&Authorized> {
        match self {
            Self::Valid(authorized) => Some(authorized),
            _ => None,
        }
    }
}

/// Decodes presented credentials against one codec and one TTL.
#[derive(Debug, Clone)]
pub struct AccessGate {
    codec: Arc<TokenCodec>,
    max_age_secs: i64,
}

impl AccessGate {
    /// Gate over `codec` accepting credentials up to `max_age_secs` old.
    pub fn new(codec: Arc<TokenCodec>, max_age_secs: i64) -> Self {
        Self {
            codec,
            max_age_secs,
        }
    }

    /// The TTL applied to every credential.
    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    /// Decide whether `raw` grants `expected`.
    pub fn authorize(&self, raw: Option<&str>, expected: Purpose) -> AuthOutcome {
        let credential = match raw.map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => {
                observe(expected, OutcomeKind::Absent);
                return AuthOutcome::Absent;
            }
        };

        let outcome = match self.codec.decode(credential, expected, self.max_age_secs) {
            Ok(payload) => AuthOutcome::Valid(Authorized {
                document_ref: payload.document_ref().map(str::to_owned),
                subject: payload.subject,
            }),
            Err(TokenError::Expired { age, .. }) => AuthOutcome::Expired { age },
            Err(err) => AuthOutcome::Invalid(err),
        };

        match &outcome {
            AuthOutcome::Invalid(err) => tracing::debug!(
                purpose = %expected,
                fingerprint = %fingerprint(credential),
                reason = %err,
                "credential rejected"
            ),
            AuthOutcome::Expired { age } => tracing::debug!(
                purpose = %expected,
                fingerprint = %fingerprint(credential),
                age,
                "credential expired"
            ),
            _ => {}
        }

        observe(expected, outcome.kind());
        outcome
    }
}

fn observe(purpose: Purpose, kind: OutcomeKind) {
    metrics::counter!(
        "visor_access_outcomes_total",
        "purpose" => purpose.as_str(),
        "outcome" => kind.as_str()
    )
    .increment(1);
}
