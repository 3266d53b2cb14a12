//! Participant identifier normalization.
//!
//! Enrollment numbers are compared case-insensitively everywhere in the
//! core. Display keeps whatever casing the roster stored.

use std::fmt;

/// Trim and lower-case a raw identifier.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// An identifier that has been through [`normalize`].
///
/// Only constructible via [`NormalizedId::new`], so keyed lookups cannot be
/// handed raw scanner or roster text by mistake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedId(String);

impl NormalizedId {
    /// Normalize `raw`.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// True when nothing but whitespace was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the normalized key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize("  TC-2025-001 "), "tc-2025-001");
        assert_eq!(normalize("\tAbC\n"), "abc");
    }

    #[test]
    fn test_normalized_id_equality_ignores_case() {
        assert_eq!(NormalizedId::new("TC-2025-001"), NormalizedId::new(" tc-2025-001"));
    }

    #[test]
    fn test_blank_is_empty() {
        assert!(NormalizedId::new("   ").is_empty());
        assert!(!NormalizedId::new("x").is_empty());
    }
}
