//! # visor-cli — Operator CLI for the Visor Report Viewer
//!
//! ## Subcommands
//!
//! - `visor keygen`: print a fresh token key for `VISOR_TOKEN_KEY`.
//! - `visor mint`: mint an access or document credential and its link.
//! - `visor inspect`: decode a credential and print its payload.
//!
//! ```bash
//! export VISOR_TOKEN_KEY=$(visor keygen)
//! visor mint --subject 9895722-7
//! visor mint --subject 9895722-7 --document B24-1187 --base-url https://informes.example.cl
//! visor inspect <credential> --purpose document
//! ```

pub mod credential;

use anyhow::{Context, Result};
use visor_token::TokenKey;

/// Parse key material from `--key` or `VISOR_TOKEN_KEY`.
pub fn load_key(raw: Option<&str>) -> Result<TokenKey> {
    let raw = raw.context("no token key: pass --key or set VISOR_TOKEN_KEY")?;
    TokenKey::parse(raw).context("failed to parse token key")
}
