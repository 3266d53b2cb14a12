//! URL-safe segment encoding.
//!
//! base64url without padding: `+` becomes `-`, `/` becomes `_` and `=` is
//! dropped, so [`DELIMITER`] can never occur inside a segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::{DecodeError, Engine as _};

/// Separator between the payload and signature segments.
pub const DELIMITER: char = '.';

/// Encode bytes as a token segment.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a token segment.
///
/// # Errors
///
/// Fails on characters outside the alphabet, padding, or non-canonical
/// trailing bits.
pub fn decode(segment: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_NO_PAD.decode(segment)
}

/// Join encoded payload and signature.
#[must_use]
pub fn join(payload: &str, signature: &str) -> String {
    let mut token = String::with_capacity(payload.len() + signature.len() + 1);
    token.push_str(payload);
    token.push(DELIMITER);
    token.push_str(signature);
    token
}

/// Split on the first delimiter.
#[must_use]
pub fn split(token: &str) -> Option<(&str, &str)> {
    token.split_once(DELIMITER)
}
