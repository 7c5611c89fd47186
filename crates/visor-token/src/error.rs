//! # Token Error Types
//!
//! Structured errors for key loading and credential encode/decode,
//! built with `thiserror`.

use thiserror::Error;

use crate::payload::Purpose;

/// Errors raised while loading symmetric key material.
///
/// Never carries the key material itself, only its shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// No key material was provided.
    #[error("token key is missing")]
    Missing,

    /// The material did not decode to exactly 32 bytes in any accepted encoding.
    #[error("token key must decode to 32 bytes (64 hex chars, base64/base64url, or 32 raw bytes); got {0} input characters")]
    Unrecognized(usize),
}

/// Errors from credential encoding and decoding.
///
/// Decode failures fall into exactly three classes: [`TokenError::Malformed`],
/// [`TokenError::Expired`] and [`TokenError::PurposeMismatch`]. The remaining
/// variants can only occur on the encode path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The grant handed to `encode` violates an input constraint.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// Bad encoding, failed authentication, or a payload outside the expected field set.
    #[error("malformed credential: {0}")]
    Malformed(&'static str),

    /// The credential is older than the allowed maximum age, or issued in the future.
    #[error("credential expired: age {age}s outside 0..={max_age}s")]
    Expired {
        /// `now - issued_at`, negative when the credential claims a future issue time.
        age: i64,
        /// The maximum age the caller allowed.
        max_age: i64,
    },

    /// An authentic credential minted for another purpose.
    #[error("purpose mismatch: expected {expected}, credential is {actual}")]
    PurposeMismatch {
        /// Purpose the endpoint requires.
        expected: Purpose,
        /// Purpose sealed in the credential.
        actual: Purpose,
    },

    /// Serializing the payload failed.
    #[error("payload serialization failed: {0}")]
    Serialization(String),

    /// The AEAD seal operation failed.
    #[error("credential sealing failed")]
    Seal,
}

impl TokenError {
    /// Whether this error came out of the decode path.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::Expired { .. } | Self::PurposeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_are_classified() {
        assert!(TokenError::Malformed("tag").is_decode_failure());
        assert!(TokenError::Expired { age: 10, max_age: 5 }.is_decode_failure());
        assert!(TokenError::PurposeMismatch {
            expected: Purpose::Access,
            actual: Purpose::Document,
        }
        .is_decode_failure());
        assert!(!TokenError::Seal.is_decode_failure());
        assert!(!TokenError::InvalidGrant("x".into()).is_decode_failure());
    }

    #[test]
    fn display_messages_carry_context() {
        let err = TokenError::PurposeMismatch {
            expected: Purpose::Access,
            actual: Purpose::Document,
        };
        assert_eq!(
            err.to_string(),
            "purpose mismatch: expected access, credential is document"
        );
        assert!(KeyError::Unrecognized(7).to_string().contains("got 7"));
    }
}
