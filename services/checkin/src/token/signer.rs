//! HMAC-SHA-256 signing and constant-time comparison.

use ring::hmac;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Shared secret bytes, zeroed on drop and redacted from debug output.
#[derive(Clone)]
pub struct SigningKey(Arc<Zeroizing<Vec<u8>>>);

impl SigningKey {
    /// Wrap a secret. An empty secret counts as not provisioned.
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Option<Self> {
        if secret.is_empty() {
            return None;
        }
        Some(Self(Arc::new(Zeroizing::new(secret.to_vec()))))
    }

    /// Constant-time check of a presented secret against this one.
    #[must_use]
    pub fn matches(&self, candidate: &[u8]) -> bool {
        constant_time_eq(&self.0, candidate)
    }

    fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// HMAC-SHA-256 signer bound to one key.
#[derive(Clone)]
pub struct HmacSigner {
    key: hmac::Key,
}

impl HmacSigner {
    /// Create a signer for `key`.
    #[must_use]
    pub fn new(key: &SigningKey) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, key.expose()),
        }
    }

    /// MAC over `data`.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        hmac::sign(&self.key, data).as_ref().to_vec()
    }

    /// Recompute the MAC over `data` and compare it with `provided`.
    #[must_use]
    pub fn verify(&self, data: &[u8], provided: &[u8]) -> bool {
        constant_time_eq(&self.sign(data), provided)
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner").field("algorithm", &"HS256").finish()
    }
}

/// Compare two byte strings without short-circuiting on the first difference.
///
/// Length is checked first; lengths are not secret. The byte comparison
/// XOR-accumulates over every position.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
