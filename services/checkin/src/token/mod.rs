//! Signed check-in tokens.
//!
//! A token is `base64url(payload_json) "." base64url(hmac_sha256(secret, encoded_payload))`.
//! The MAC covers the *encoded* payload bytes, so verification never has to
//! re-serialize anything before checking authenticity.

pub mod codec;
pub mod payload;
pub mod service;
pub mod signer;

pub use codec::DELIMITER;
pub use payload::{DecodedPayload, TokenPayload, TOKEN_VERSION};
pub use service::{TokenService, VerifiedToken};
pub use signer::{constant_time_eq, HmacSigner, SigningKey};
