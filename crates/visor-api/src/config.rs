//! # Service Configuration
//!
//! Everything is read from the environment once, before the listener binds.
//! A missing or unusable token key is fatal.
//!
//! | Variable                 | Default          |
//! |--------------------------|------------------|
//! | `VISOR_TOKEN_KEY`        | required         |
//! | `VISOR_ISSUANCE_API_KEY` | unset: issuance disabled |
//! | `VISOR_PUBLIC_BASE_URL`  | `http://{Host}`  |
//! | `VISOR_ACCESS_LINK_PATH` | `/`              |
//! | `VISOR_TOKEN_TTL_SECS`   | `86400`          |
//! | `VISOR_REPORTS_FILE`     | unset: empty store |
//! | `PORT`                   | `8080`           |

use std::path::PathBuf;

use thiserror::Error;
use visor_token::{KeyError, TokenKey, DEFAULT_TTL_SECS};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const DEFAULT_PORT: u16 = 8080;

/// A shared secret compared against request headers.
///
/// Zeroized on drop; `Debug` never prints the value.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("VISOR_TOKEN_KEY: {0}")]
    Key(#[from] KeyError),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Process-wide configuration.
///
/// Custom `Debug` keeps the key and the issuance secret out of logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Listen port.
    pub port: u16,
    /// Symmetric credential key.
    pub token_key: TokenKey,
    /// `None` disables issuance entirely.
    pub issuance_key: Option<SecretToken>,
    /// Scheme and authority used in minted links, without a trailing slash.
    pub public_base_url: Option<String>,
    /// Front-end path the access link points at.
    pub access_link_path: String,
    /// Maximum credential age, shared by both purposes.
    pub token_ttl_secs: i64,
    /// JSON seed file for the in-memory report store.
    pub reports_file: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("token_key", &"[REDACTED]")
            .field(
                "issuance_key",
                &self.issuance_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_base_url", &self.public_base_url)
            .field("access_link_path", &self.access_link_path)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("reports_file", &self.reports_file)
            .finish()
    }
}

impl AppConfig {
    /// Defaults around an explicit key; issuance stays disabled.
    pub fn new(token_key: TokenKey) -> Self {
        Self {
            port: DEFAULT_PORT,
            token_key,
            issuance_key: None,
            public_base_url: None,
            access_link_path: "/".to_string(),
            token_ttl_secs: DEFAULT_TTL_SECS,
            reports_file: None,
        }
    }

    pub fn with_issuance_key(mut self, key: impl Into<String>) -> Self {
        self.issuance_key = Some(SecretToken::new(key));
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_ttl_secs(mut self, ttl: i64) -> Self {
        self.token_ttl_secs = ttl;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let raw_key = get("VISOR_TOKEN_KEY").unwrap_or_default();
        let mut config = Self::new(TokenKey::parse(&raw_key)?);

        config.issuance_key = get("VISOR_ISSUANCE_API_KEY").map(SecretToken::new);

        if let Some(raw) = get("VISOR_PUBLIC_BASE_URL") {
            config.public_base_url = Some(parse_base_url(&raw)?);
        }

        if let Some(path) = get("VISOR_ACCESS_LINK_PATH") {
            let path = path.trim();
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    var: "VISOR_ACCESS_LINK_PATH",
                    reason: "must start with '/'".into(),
                });
            }
            config.access_link_path = path.to_string();
        }

        if let Some(raw) = get("VISOR_TOKEN_TTL_SECS") {
            config.token_ttl_secs = match raw.trim().parse::<i64>() {
                Ok(ttl) if ttl > 0 => ttl,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "VISOR_TOKEN_TTL_SECS",
                        reason: format!("expected a positive number of seconds, got {raw:?}"),
                    })
                }
            };
        }

        if let Some(raw) = get("PORT") {
            config.port = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                reason: format!("expected a port number, got {raw:?}"),
            })?;
        }

        config.reports_file = get("VISOR_REPORTS_FILE").map(PathBuf::from);

        Ok(config)
    }
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "VISOR_PUBLIC_BASE_URL",
        reason,
    };
    let trimmed = raw.trim().trim_end_matches('/');
    let url = url::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment".into()));
    }
    Ok(trimmed.to_string())
}
