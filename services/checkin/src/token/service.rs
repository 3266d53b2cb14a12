//! Token issuance and verification.
//!
//! Stateless: the only input besides the token and the clock is the shared
//! secret, so any replica holding the secret can verify what another issued.

use super::codec;
use super::payload::{DecodedPayload, TokenPayload};
use super::signer::{HmacSigner, SigningKey};
use crate::error::TokenError;
use crate::identifier::NormalizedId;
use crate::metrics;
use serde::Serialize;
use std::time::Duration;

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedToken {
    /// Identifier as issued, original casing
    pub identifier: String,
    /// Issuance time carried in the token
    pub issued_at_millis: i64,
    /// Time verification was performed
    pub verified_at_millis: i64,
    /// Payload format version
    pub version: u32,
}

/// Issues and verifies signed check-in tokens.
#[derive(Debug, Clone)]
pub struct TokenService {
    signer: Option<HmacSigner>,
    max_age_millis: i64,
}

impl TokenService {
    /// Create a service. `None` leaves it unconfigured: every call fails
    /// with [`TokenError::Unconfigured`] rather than falling back to an
    /// unsigned scheme.
    #[must_use]
    pub fn new(key: Option<&SigningKey>, max_age: Duration) -> Self {
        Self {
            signer: key.map(HmacSigner::new),
            max_age_millis: i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Whether a signing secret is available.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.signer.is_some()
    }

    /// Freshness window in milliseconds.
    #[must_use]
    pub fn max_age_millis(&self) -> i64 {
        self.max_age_millis
    }

    /// Issue a token binding `identifier` to `now_millis`.
    ///
    /// The identifier is embedded as given (not normalized) so the scanner
    /// can display the original casing.
    ///
    /// # Errors
    ///
    /// [`TokenError::EmptyIdentifier`] for a blank identifier,
    /// [`TokenError::Unconfigured`] without a secret,
    /// [`TokenError::Encoding`] if the payload cannot be serialized.
    pub fn issue(&self, identifier: &str, now_millis: i64) -> Result<String, TokenError> {
        if NormalizedId::new(identifier).is_empty() {
            return Err(TokenError::EmptyIdentifier);
        }
        let signer = self.signer.as_ref().ok_or(TokenError::Unconfigured)?;

        let json = TokenPayload::new(identifier, now_millis)
            .to_json()
            .map_err(|_| TokenError::Encoding)?;
        let payload = codec::encode(&json);
        let signature = codec::encode(&signer.sign(payload.as_bytes()));

        metrics::record_token_issued();
        Ok(codec::join(&payload, &signature))
    }

    /// Verify `token` at `now_millis`.
    ///
    /// # Errors
    ///
    /// In check order: [`TokenError::InvalidToken`], [`TokenError::Unconfigured`],
    /// [`TokenError::SignatureMismatch`], [`TokenError::InvalidPayload`]
    /// (structure), [`TokenError::Expired`], [`TokenError::InvalidPayload`]
    /// (identifier).
    pub fn verify(&self, token: &str, now_millis: i64) -> Result<VerifiedToken, TokenError> {
        let result = self.check(token, now_millis);
        metrics::record_token_verification(match &result {
            Ok(_) => "valid",
            Err(e) => e.kind(),
        });
        result
    }

    fn check(&self, token: &str, now_millis: i64) -> Result<VerifiedToken, TokenError> {
        if token.is_empty() {
            return Err(TokenError::InvalidToken);
        }
        let (payload, signature) = codec::split(token).ok_or(TokenError::InvalidToken)?;
        let signer = self.signer.as_ref().ok_or(TokenError::Unconfigured)?;

        // An undecodable signature cannot match; report it the same way.
        let provided = codec::decode(signature).map_err(|_| TokenError::SignatureMismatch)?;
        if !signer.verify(payload.as_bytes(), &provided) {
            return Err(TokenError::SignatureMismatch);
        }

        let bytes = codec::decode(payload).map_err(|_| TokenError::InvalidPayload)?;
        let decoded = DecodedPayload::parse(&bytes)?;

        if now_millis.saturating_sub(decoded.issued_at_millis) > self.max_age_millis {
            return Err(TokenError::Expired);
        }

        let identifier = decoded.identifier.ok_or(TokenError::InvalidPayload)?;

        Ok(VerifiedToken {
            identifier,
            issued_at_millis: decoded.issued_at_millis,
            verified_at_millis: now_millis,
            version: decoded.version,
        })
    }
}
