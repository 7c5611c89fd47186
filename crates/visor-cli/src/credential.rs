//! # Credential Subcommands
//!
//! Operator access to the token codec outside the service: generating the
//! process key, minting links by hand, and inspecting a credential someone
//! reports as broken.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use visor_token::{
    fingerprint, Grant, Purpose, TokenCodec, TokenError, TokenKey, TokenPayload, DEFAULT_TTL_SECS,
};

/// Arguments for `visor mint`.
#[derive(Args, Debug)]
pub struct MintArgs {
    /// Patient identifier (RUT) the credential is bound to.
    #[arg(long)]
    pub subject: String,

    /// Mint a document credential for this biopsy number instead of an access credential.
    #[arg(long)]
    pub document: Option<String>,

    /// Scheme and authority for the printed link.
    #[arg(long, default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Front-end path for access links.
    #[arg(long, default_value = "/")]
    pub link_path: String,

    /// Token key; read from the environment when omitted.
    #[arg(long, env = "VISOR_TOKEN_KEY", hide_env_values = true)]
    pub key: Option<String>,
}

/// Arguments for `visor inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// The credential to decode.
    pub credential: String,

    /// Purpose the credential is expected to carry (access or document).
    #[arg(long, default_value = "access")]
    pub purpose: Purpose,

    /// Maximum accepted age in seconds.
    #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
    pub max_age: i64,

    /// Token key; read from the environment when omitted.
    #[arg(long, env = "VISOR_TOKEN_KEY", hide_env_values = true)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Minted {
    pub credential: String,
    pub purpose: Purpose,
    pub link: String,
    pub fingerprint: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Inspection {
    pub subject: String,
    pub purpose: Purpose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub age_secs: i64,
    pub schema_version: u32,
}

impl Inspection {
    fn new(payload: TokenPayload, now: i64) -> Self {
        Self {
            purpose: payload.purpose(),
            document_ref: payload.document_ref().map(str::to_owned),
            issued_at: timestamp(payload.issued_at),
            age_secs: now.saturating_sub(payload.issued_at),
            schema_version: payload.schema_version,
            subject: payload.subject,
        }
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

pub fn keygen() -> String {
    TokenKey::generate().to_base64url()
}

pub fn mint(codec: &TokenCodec, args: &MintArgs) -> Result<Minted> {
    let grant = match &args.document {
        Some(document_ref) => Grant::document(args.subject.trim(), document_ref.trim()),
        None => Grant::access(args.subject.trim()),
    };
    let credential = codec.encode(&grant)?;
    let base = args.base_url.trim_end_matches('/');
    let link = match grant.scope.purpose() {
        Purpose::Access => format!("{base}{}?token={credential}", args.link_path),
        Purpose::Document => format!("{base}/api/pdf/v2/{credential}/"),
    };
    Ok(Minted {
        fingerprint: fingerprint(credential.as_str()),
        purpose: grant.scope.purpose(),
        expires_at: timestamp(codec.now().saturating_add(DEFAULT_TTL_SECS)),
        credential: credential.into_string(),
        link,
    })
}

pub fn inspect(codec: &TokenCodec, args: &InspectArgs) -> Result<Inspection, TokenError> {
    let payload = codec.decode(args.credential.trim(), args.purpose, args.max_age)?;
    Ok(Inspection::new(payload, codec.now()))
}

pub fn run_mint(args: &MintArgs) -> Result<u8> {
    let key = crate::load_key(args.key.as_deref())?;
    let minted = mint(&TokenCodec::new(&key), args)?;
    println!("{}", serde_json::to_string_pretty(&minted)?);
    Ok(0)
}

pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let key = crate::load_key(args.key.as_deref())?;
    match inspect(&TokenCodec::new(&key), args) {
        Ok(inspection) => {
            println!("{}", serde_json::to_string_pretty(&inspection)?);
            Ok(0)
        }
        Err(err) => {
            println!("INVALID: {err}");
            Ok(1)
        }
    }
}
