//! # Token Codec
//!
//! Seals a [`Grant`] into a URL-safe credential and opens it again.
//!
//! ## Envelope
//!
//! ```text
//! +---------+--------------+--------------------------------------+
//! | version | nonce        | ciphertext || poly1305 tag           |
//! | 1 byte  | 12 bytes     | len(json) + 16 bytes                 |
//! +---------+--------------+--------------------------------------+
//! ```
//!
//! The version byte is bound as associated data, so it cannot be swapped
//! without failing authentication. The whole envelope is encoded as unpadded
//! base64url, which is safe in both query strings and path segments.
//!
//! ## Decode Order
//!
//! 1. base64url + envelope shape + AEAD tag → [`TokenError::Malformed`]
//! 2. payload field set → [`TokenError::Malformed`]
//! 3. age outside `0..=max_age` → [`TokenError::Expired`]
//! 4. purpose → [`TokenError::PurposeMismatch`]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::clock::{Clock, SystemClock};
use crate::error::TokenError;
use crate::key::TokenKey;
use crate::payload::{Grant, Purpose, TokenPayload, WirePayload, SCHEMA_VERSION};

/// Default maximum credential age: 24 hours, shared by both purposes.
pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

const ENVELOPE_VERSION: u8 = 0x01;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// An opaque, URL-safe credential string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Borrow the credential text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the credential text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Credential {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Short, non-reversible identifier for a credential, safe to log.
///
/// First 16 hex characters of the SHA-256 of the credential text.
pub fn fingerprint(credential: &str) -> String {
    Sha256::digest(credential.as_bytes())
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Authenticated-encryption codec bound to one process-wide key.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and no
/// mutable state is touched.
#[derive(Clone)]
pub struct TokenCodec {
    cipher: ChaCha20Poly1305,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("key", &"[REDACTED]")
            .field("clock", &self.clock)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec on the wall clock.
    pub fn new(key: &TokenKey) -> Self {
        Self::with_clock(key, Arc::new(SystemClock))
    }

    /// Build a codec reading time from `clock`.
    pub fn with_clock(key: &TokenKey, clock: Arc<dyn Clock>) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
            clock,
        }
    }

    /// Current time according to this codec's clock.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Mint a credential for `grant`, stamped with the current time.
    pub fn encode(&self, grant: &Grant) -> Result<Credential, TokenError> {
        grant.validate()?;
        let payload = TokenPayload {
            subject: grant.subject.clone(),
            scope: grant.scope.clone(),
            issued_at: self.clock.now(),
            schema_version: SCHEMA_VERSION,
        };
        self.seal(&payload)
    }

    /// Authenticate and open `credential`, then enforce freshness and purpose.
    ///
    /// `credential` is attacker-controlled; nothing inside it is interpreted
    /// before the authentication tag checks out.
    pub fn decode(
        &self,
        credential: &str,
        expected: Purpose,
        max_age_secs: i64,
    ) -> Result<TokenPayload, TokenError> {
        let plaintext = self.open(credential)?;

        let wire: WirePayload = serde_json::from_slice(&plaintext)
            .map_err(|_| TokenError::Malformed("payload does not match the expected field set"))?;
        let payload = TokenPayload::try_from(wire)?;

        let age = self.clock.now().saturating_sub(payload.issued_at);
        if !(0..=max_age_secs).contains(&age) {
            return Err(TokenError::Expired {
                age,
                max_age: max_age_secs,
            });
        }

        if payload.purpose() != expected {
            return Err(TokenError::PurposeMismatch {
                expected,
                actual: payload.purpose(),
            });
        }

        Ok(payload)
    }

    fn seal(&self, payload: &TokenPayload) -> Result<Credential, TokenError> {
        let plaintext = serde_json::to_vec(&WirePayload::from(payload))
            .map_err(|e| TokenError::Serialization(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &plaintext,
                    aad: &[ENVELOPE_VERSION],
                },
            )
            .map_err(|_| TokenError::Seal)?;

        let mut envelope = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(Credential(URL_SAFE_NO_PAD.encode(envelope)))
    }

    fn open(&self, credential: &str) -> Result<Vec<u8>, TokenError> {
        let envelope = URL_SAFE_NO_PAD
            .decode(credential)
            .map_err(|_| TokenError::Malformed("not valid base64url"))?;

        if envelope.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(TokenError::Malformed("envelope too short"));
        }

        let (version, rest) = envelope.split_at(1);
        if version[0] != ENVELOPE_VERSION {
            return Err(TokenError::Malformed("unknown envelope version"));
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: version,
                },
            )
            .map_err(|_| TokenError::Malformed("authentication failed"))
    }
}
