#![deny(missing_docs)]

//! # visor-token — Credential Codec for the Visor Report Viewer
//!
//! Issues and validates the short-lived bearer credentials that gate read
//! access to pathology reports. A credential is a URL-safe string carrying
//! an encrypted, authenticated [`TokenPayload`]:
//!
//! ```text
//! base64url( version:u8 || nonce:[u8; 12] || chacha20poly1305(json payload) )
//! ```
//!
//! ## Design Principles
//!
//! 1. **One codec, two purposes.** Access links and document links go
//!    through the same [`TokenCodec`]; the [`Purpose`] inside the sealed
//!    payload is what separates them.
//!
//! 2. **The key is configuration, not global state.** [`TokenKey`] is
//!    parsed once at startup and moved into the codec. It is zeroized on
//!    drop and its `Debug` output is redacted.
//!
//! 3. **Decode never trusts structure before authentication.** The AEAD tag
//!    is checked before a single payload byte is interpreted.
//!
//! 4. **Stateless validity.** A credential is valid while it is authentic,
//!    younger than the caller's maximum age, and of the expected purpose.
//!    There is no revocation store.

pub mod clock;
pub mod codec;
pub mod error;
pub mod key;
pub mod payload;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{fingerprint, Credential, TokenCodec, DEFAULT_TTL_SECS};
pub use error::{KeyError, TokenError};
pub use key::TokenKey;
pub use payload::{Grant, Purpose, Scope, TokenPayload, SCHEMA_VERSION};
