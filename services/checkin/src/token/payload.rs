use crate::error::TokenError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current payload format version.
pub const TOKEN_VERSION: u32 = 1;

/// Token payload as issued.
///
/// Field order is the serialization order, giving the compact form
/// `{"e":"…","t":…,"v":1}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPayload {
    /// Identifier exactly as supplied at issuance
    pub e: String,
    /// Issuance time, epoch milliseconds
    pub t: i64,
    /// Format version
    pub v: u32,
}

impl TokenPayload {
    /// Payload for `identifier` issued at `issued_at_millis`.
    #[must_use]
    pub fn new(identifier: impl Into<String>, issued_at_millis: i64) -> Self {
        Self {
            e: identifier.into(),
            t: issued_at_millis,
            v: TOKEN_VERSION,
        }
    }

    /// Compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Only fails if serde_json does, which a plain struct of a string and
    /// two integers does not.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Payload after structural checks but before freshness and identifier checks.
///
/// Verification has to report an expired token before it complains about a
/// missing identifier, so `identifier` stays optional here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// `e` when it is a non-empty string
    pub identifier: Option<String>,
    /// `t`
    pub issued_at_millis: i64,
    /// `v`, defaulting to 1 when absent
    pub version: u32,
}

impl DecodedPayload {
    /// Parse decoded payload bytes.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidPayload`] if the bytes are not a JSON object,
    /// `t` is not an integer, or `v` names an unsupported version.
    pub fn parse(bytes: &[u8]) -> Result<Self, TokenError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|_| TokenError::InvalidPayload)?;
        let obj = value.as_object().ok_or(TokenError::InvalidPayload)?;

        let issued_at_millis = obj
            .get("t")
            .and_then(Value::as_i64)
            .ok_or(TokenError::InvalidPayload)?;

        let version = match obj.get("v") {
            None => TOKEN_VERSION,
            Some(v) if v.as_u64() == Some(u64::from(TOKEN_VERSION)) => TOKEN_VERSION,
            Some(_) => return Err(TokenError::InvalidPayload),
        };

        let identifier = obj
            .get("e")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        Ok(Self {
            identifier,
            issued_at_millis,
            version,
        })
    }
}
