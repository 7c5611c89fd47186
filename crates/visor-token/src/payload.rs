//! # Credential Payload
//!
//! What a credential authorizes, and the exact field set sealed inside it.
//!
//! ## Wire Form
//!
//! The sealed plaintext is a JSON object with a closed field set:
//!
//! ```json
//! {"sub":"9895722-7","purpose":"document","doc":"B24-1187","iat":1760000000,"v":1}
//! ```
//!
//! `doc` is present exactly when `purpose` is `document`. Unknown fields,
//! missing fields and unsupported versions are all rejected as malformed.

use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Current payload schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// The class of a credential, constraining what it authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// General access to a subject's report list.
    Access,
    /// Retrieval of one specific report document.
    Document,
}

impl Purpose {
    /// Return the string representation of this purpose.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Purpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Self::Access),
            "document" => Ok(Self::Document),
            other => Err(format!("unknown purpose: {other}")),
        }
    }
}

/// Purpose together with the data that purpose requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Access to everything listed for the subject.
    Access,
    /// One report, identified by its document (biopsy) reference.
    Document {
        /// Report identifier.
        document_ref: String,
    },
}

impl Scope {
    /// The purpose tag of this scope.
    pub fn purpose(&self) -> Purpose {
        match self {
            Self::Access => Purpose::Access,
            Self::Document { .. } => Purpose::Document,
        }
    }

    /// The document reference, for document scopes.
    pub fn document_ref(&self) -> Option<&str> {
        match self {
            Self::Access => None,
            Self::Document { document_ref } => Some(document_ref),
        }
    }
}

/// The caller-supplied part of a credential: who, and for what.
///
/// The issuance time is deliberately absent; only the codec sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Patient / record identifier.
    pub subject: String,
    /// What the credential authorizes.
    pub scope: Scope,
}

impl Grant {
    /// A general access grant for `subject`.
    pub fn access(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            scope: Scope::Access,
        }
    }

    /// A grant for one document belonging to `subject`.
    pub fn document(subject: impl Into<String>, document_ref: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            scope: Scope::Document {
                document_ref: document_ref.into(),
            },
        }
    }

    /// Check the encode-time input constraints.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.subject.trim().is_empty() {
            return Err(TokenError::InvalidGrant("subject must not be empty".into()));
        }
        if let Scope::Document { document_ref } = &self.scope {
            if document_ref.trim().is_empty() {
                return Err(TokenError::InvalidGrant(
                    "document credentials require a document reference".into(),
                ));
            }
        }
        Ok(())
    }
}

/// The authenticated content of a credential, as reconstructed by decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    /// Patient / record identifier.
    pub subject: String,
    /// What the credential authorizes.
    pub scope: Scope,
    /// Seconds since the epoch at which the codec sealed the credential.
    pub issued_at: i64,
    /// Payload schema version.
    pub schema_version: u32,
}

impl TokenPayload {
    /// The purpose tag of this payload.
    pub fn purpose(&self) -> Purpose {
        self.scope.purpose()
    }

    /// The document reference, for document payloads.
    pub fn document_ref(&self) -> Option<&str> {
        self.scope.document_ref()
    }

    /// The grant this payload was minted from.
    pub fn grant(&self) -> Grant {
        Grant {
            subject: self.subject.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// Closed wire representation of [`TokenPayload`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WirePayload {
    sub: String,
    purpose: Purpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    iat: i64,
    v: u32,
}

impl From<&TokenPayload> for WirePayload {
    fn from(payload: &TokenPayload) -> Self {
        Self {
            sub: payload.subject.clone(),
            purpose: payload.purpose(),
            doc: payload.document_ref().map(str::to_owned),
            iat: payload.issued_at,
            v: payload.schema_version,
        }
    }
}

impl TryFrom<WirePayload> for TokenPayload {
    type Error = TokenError;

    fn try_from(wire: WirePayload) -> Result<Self, Self::Error> {
        if wire.v != SCHEMA_VERSION {
            return Err(TokenError::Malformed("unsupported payload version"));
        }
        if wire.sub.trim().is_empty() {
            return Err(TokenError::Malformed("empty subject"));
        }
        let scope = match (wire.purpose, wire.doc) {
            (Purpose::Access, None) => Scope::Access,
            (Purpose::Document, Some(document_ref)) if !document_ref.trim().is_empty() => {
                Scope::Document { document_ref }
            }
            (Purpose::Access, Some(_)) => {
                return Err(TokenError::Malformed("access payload carries a document"))
            }
            (Purpose::Document, _) => {
                return Err(TokenError::Malformed("document payload lacks a document"))
            }
        };
        Ok(Self {
            subject: wire.sub,
            scope,
            issued_at: wire.iat,
            schema_version: wire.v,
        })
    }
}
