//! # Symmetric Key Material
//!
//! The single process-wide key used to seal and open credentials.
//!
//! ## Accepted Encodings
//!
//! Operators inject the key through the environment, so [`TokenKey::parse`]
//! is lenient about the encoding but strict about the length (32 bytes):
//!
//! - 64 hexadecimal characters
//! - base64url, with or without padding (a Fernet key qualifies)
//! - standard base64
//! - exactly 32 raw bytes
//!
//! ## Security Invariants
//!
//! - Key bytes are zeroized on drop.
//! - `Debug` never prints key bytes.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KeyError;

/// Length of the symmetric key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric key for credential sealing.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TokenKey([u8; KEY_LEN]);

impl TokenKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse key material in any of the accepted encodings.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KeyError::Missing);
        }

        if trimmed.len() == 2 * KEY_LEN && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Some(bytes) = decode_hex(trimmed) {
                return Self::from_slice(&bytes).ok_or(KeyError::Unrecognized(trimmed.len()));
            }
        }

        for engine in [&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD] {
            if let Ok(mut bytes) = engine.decode(trimmed) {
                let key = Self::from_slice(&bytes);
                bytes.zeroize();
                if let Some(key) = key {
                    return Ok(key);
                }
            }
        }

        Self::from_slice(trimmed.as_bytes()).ok_or(KeyError::Unrecognized(trimmed.len()))
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encode as unpadded base64url, the form `visor keygen` prints.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenKey([REDACTED])")
    }
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    let digits = input.as_bytes();
    let mut bytes = Vec::with_capacity(input.len() / 2);
    for pair in digits.chunks(2) {
        let hi = (pair[0] as char).to_digit(16)?;
        let lo = (pair[1] as char).to_digit(16)?;
        bytes.push(((hi << 4) | lo) as u8);
    }
    Some(bytes)
}
