//! Scan boundary: from scanned text to a ledger outcome.
//!
//! A scanned code is either a signed token or, when signing is disabled, a
//! bare identifier. The decision is made once, here, so the rest of the
//! pipeline works with a resolved identifier.

pub mod debounce;

pub use debounce::ScanDebouncer;

use crate::error::{LedgerError, TokenError};
use crate::identifier::NormalizedId;
use crate::ledger::{Ledger, ScanOutcome};
use crate::metrics;
use crate::roster::{Roster, RosterEntry, RosterLookup};
use crate::token::{TokenService, DELIMITER};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Station name used when the client does not send one.
pub const DEFAULT_STATION: &str = "default";

/// What a scanned code contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedPayload {
    /// `payload.signature` token
    Token(String),
    /// Bare identifier
    RawIdentifier(String),
}

impl ScannedPayload {
    /// Classify scanned text. Identifiers never contain the token delimiter.
    #[must_use]
    pub fn decode(text: &str) -> Self {
        let text = text.trim();
        if text.contains(DELIMITER) {
            Self::Token(text.to_string())
        } else {
            Self::RawIdentifier(text.to_string())
        }
    }
}

/// Scanned payload after token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Identifier to apply to the ledger.
    Identifier(String),
    /// Token failed verification; never reaches the ledger.
    Rejected(TokenError),
}

/// Turn a scanned payload into an identifier.
///
/// Without a signing secret, codes are rendered from raw identifiers, so an
/// unverifiable token is treated as one.
#[must_use]
pub fn resolve(payload: &ScannedPayload, tokens: &TokenService, now_millis: i64) -> Resolution {
    match payload {
        ScannedPayload::RawIdentifier(id) => Resolution::Identifier(id.clone()),
        ScannedPayload::Token(token) => match tokens.verify(token, now_millis) {
            Ok(verified) => Resolution::Identifier(verified.identifier),
            Err(TokenError::Unconfigured) => {
                warn!("Signing not configured, treating scanned code as a raw identifier");
                Resolution::Identifier(token.clone())
            }
            Err(e) => Resolution::Rejected(e),
        },
    }
}

/// Scan result status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// First verification
    Verified,
    /// Replay of a verified participant
    AlreadyVerified,
    /// Not on the roster
    NotFound,
    /// Token failed verification
    Rejected,
    /// Suppressed as a re-read
    Debounced,
}

impl ScanStatus {
    /// Operator-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Verified => "Verification Successful!",
            Self::AlreadyVerified => "Already Verified.",
            Self::NotFound => "Participant Not Found!",
            Self::Rejected => "Invalid Check-in Code!",
            Self::Debounced => "Scan ignored.",
        }
    }

    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::AlreadyVerified => "already_verified",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
            Self::Debounced => "debounced",
        }
    }
}

/// What the scanning station shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Outcome
    pub status: ScanStatus,
    /// Message for the operator
    pub message: &'static str,
    /// Resolved identifier (roster casing when known)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Roster entry of the participant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<RosterEntry>,
    /// First verification time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at_millis: Option<i64>,
    /// Why a token was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl ScanReport {
    fn new(status: ScanStatus) -> Self {
        Self {
            status,
            message: status.message(),
            identifier: None,
            member: None,
            verified_at_millis: None,
            reason: None,
        }
    }
}

/// Full scan pipeline: decode, resolve, debounce, apply.
pub struct Scanner {
    tokens: Arc<TokenService>,
    roster: Arc<Roster>,
    ledger: Arc<Ledger>,
    debouncer: ScanDebouncer,
}

impl Scanner {
    /// Scanner over the shared services.
    #[must_use]
    pub fn new(
        tokens: Arc<TokenService>,
        roster: Arc<Roster>,
        ledger: Arc<Ledger>,
        debouncer: ScanDebouncer,
    ) -> Self {
        Self {
            tokens,
            roster,
            ledger,
            debouncer,
        }
    }

    /// Process scanned `text` from `station` at `now_millis`.
    ///
    /// # Errors
    ///
    /// Only ledger storage failures; every other outcome is a report.
    pub async fn scan(
        &self,
        text: &str,
        station: &str,
        now_millis: i64,
    ) -> Result<ScanReport, LedgerError> {
        let payload = ScannedPayload::decode(text);
        let resolution = resolve(&payload, &self.tokens, now_millis);
        let key = match &resolution {
            Resolution::Identifier(identifier) => NormalizedId::new(identifier),
            Resolution::Rejected(_) => NormalizedId::new(text),
        };

        let report = if self.debouncer.check(station, &key, now_millis) {
            let report = match resolution {
                Resolution::Rejected(e) => {
                    debug!(station, reason = e.kind(), "Scanned token rejected");
                    ScanReport {
                        reason: Some(e.kind()),
                        ..ScanReport::new(ScanStatus::Rejected)
                    }
                }
                Resolution::Identifier(identifier) => {
                    let outcome = self
                        .ledger
                        .apply_scan(&identifier, self.roster.as_ref(), now_millis)
                        .await?;
                    self.report(outcome)
                }
            };
            self.debouncer.record(station, &key, now_millis);
            report
        } else {
            ScanReport::new(ScanStatus::Debounced)
        };

        metrics::record_scan(report.status.as_str());
        Ok(report)
    }

    /// Forget debounce history, after a ledger reset.
    pub fn reset(&self) {
        self.debouncer.reset();
    }

    fn report(&self, outcome: ScanOutcome) -> ScanReport {
        let status = match &outcome {
            ScanOutcome::FirstVerification(_) => ScanStatus::Verified,
            ScanOutcome::AlreadyVerified(_) => ScanStatus::AlreadyVerified,
            ScanOutcome::NotFound { .. } => ScanStatus::NotFound,
        };
        match outcome {
            ScanOutcome::FirstVerification(record) | ScanOutcome::AlreadyVerified(record) => {
                ScanReport {
                    member: self.roster.lookup(&NormalizedId::new(&record.identifier)),
                    verified_at_millis: Some(record.verified_at_millis),
                    identifier: Some(record.identifier),
                    ..ScanReport::new(status)
                }
            }
            ScanOutcome::NotFound { identifier } => ScanReport {
                identifier: Some(identifier),
                ..ScanReport::new(status)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Insertion, LedgerStore, MemoryLedgerStore, VerificationRecord};
    use crate::token::SigningKey;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Memory store that fails every call while `down` is set.
    #[derive(Default)]
    struct FlakyLedgerStore {
        inner: MemoryLedgerStore,
        down: AtomicBool,
    }

    impl FlakyLedgerStore {
        fn check(&self) -> Result<(), LedgerError> {
            if self.down.load(Ordering::Relaxed) {
                Err(LedgerError::Storage("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl LedgerStore for FlakyLedgerStore {
        async fn get(&self, key: &NormalizedId) -> Result<Option<VerificationRecord>, LedgerError> {
            self.check()?;
            self.inner.get(key).await
        }
        async fn insert_if_absent(
            &self,
            key: &NormalizedId,
            record: VerificationRecord,
        ) -> Result<Insertion, LedgerError> {
            self.check()?;
            self.inner.insert_if_absent(key, record).await
        }
        async fn all(&self) -> Result<Vec<VerificationRecord>, LedgerError> {
            self.check()?;
            self.inner.all().await
        }
        async fn clear(&self) -> Result<(), LedgerError> {
            self.check()?;
            self.inner.clear().await
        }
    }

    const WEEK_MS: i64 = 604_800_000;

    fn tokens(secret: Option<&str>) -> Arc<TokenService> {
        let key = secret.and_then(|s| SigningKey::from_secret(s.as_bytes()));
        Arc::new(TokenService::new(key.as_ref(), Duration::from_millis(WEEK_MS as u64)))
    }

    fn scanner(tokens: Arc<TokenService>) -> Scanner {
        let roster = Roster::from_entries(vec![
            RosterEntry::new("Ada", "TC-2025-001").with_program("CS"),
            RosterEntry::new("Bob", "TC-2025-002"),
        ])
        .unwrap();
        Scanner::new(
            tokens,
            Arc::new(roster),
            Arc::new(Ledger::in_memory()),
            ScanDebouncer::new(Duration::from_millis(1200), Duration::from_millis(2500)),
        )
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            ScannedPayload::decode("  abc.def \n"),
            ScannedPayload::Token("abc.def".to_string())
        );
        assert_eq!(
            ScannedPayload::decode(" TC-1 "),
            ScannedPayload::RawIdentifier("TC-1".to_string())
        );
    }

    #[test]
    fn test_resolve_unconfigured_falls_back_to_raw() {
        let payload = ScannedPayload::Token("a.b".to_string());
        assert_eq!(
            resolve(&payload, &tokens(None), 0),
            Resolution::Identifier("a.b".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_bad_token() {
        let payload = ScannedPayload::Token("a.b".to_string());
        assert_eq!(
            resolve(&payload, &tokens(Some("k")), 0),
            Resolution::Rejected(TokenError::SignatureMismatch)
        );
    }

    #[tokio::test]
    async fn test_token_scan_scenario() {
        let tokens = tokens(Some("s3cret"));
        let scanner = scanner(Arc::clone(&tokens));
        let token = tokens.issue("TC-2025-001", 1_000).unwrap();

        let first = scanner.scan(&token, "desk", 2_000).await.unwrap();
        assert_eq!(first.status, ScanStatus::Verified);
        assert_eq!(first.message, "Verification Successful!");
        assert_eq!(first.verified_at_millis, Some(2_000));
        assert_eq!(first.member.unwrap().program, "CS");

        let replay = scanner.scan(&token, "desk", 10_000).await.unwrap();
        assert_eq!(replay.status, ScanStatus::AlreadyVerified);
        assert_eq!(replay.message, "Already Verified.");
        assert_eq!(replay.verified_at_millis, Some(2_000));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let tokens = tokens(Some("s3cret"));
        let scanner = scanner(Arc::clone(&tokens));
        let token = tokens.issue("TC-2025-001", 0).unwrap();

        let report = scanner.scan(&token, "desk", WEEK_MS + 1).await.unwrap();
        assert_eq!(report.status, ScanStatus::Rejected);
        assert_eq!(report.reason, Some("expired"));
    }

    #[tokio::test]
    async fn test_raw_identifier_not_found() {
        let scanner = scanner(tokens(None));
        let report = scanner.scan(" NOBODY ", "desk", 0).await.unwrap();
        assert_eq!(report.status, ScanStatus::NotFound);
        assert_eq!(report.message, "Participant Not Found!");
        assert_eq!(report.identifier.as_deref(), Some("NOBODY"));
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_debounce_retry() {
        let store = Arc::new(FlakyLedgerStore::default());
        store.down.store(true, Ordering::Relaxed);
        let roster = Roster::from_entries(vec![RosterEntry::new("Ada", "TC-1")]).unwrap();
        let scanner = Scanner::new(
            tokens(None),
            Arc::new(roster),
            Arc::new(Ledger::new(store.clone())),
            ScanDebouncer::new(Duration::from_millis(1200), Duration::from_millis(2500)),
        );

        assert!(scanner.scan("TC-1", "desk", 0).await.is_err());

        store.down.store(false, Ordering::Relaxed);
        let retry = scanner.scan("TC-1", "desk", 1500).await.unwrap();
        assert_eq!(retry.status, ScanStatus::Verified);
    }

    #[tokio::test]
    async fn test_rejected_rereads_debounced() {
        let scanner = scanner(tokens(Some("s3cret")));
        let first = scanner.scan("forged.code", "desk", 0).await.unwrap();
        assert_eq!(first.status, ScanStatus::Rejected);

        let reread = scanner.scan(" forged.code ", "desk", 100).await.unwrap();
        assert_eq!(reread.status, ScanStatus::Debounced);

        let later = scanner.scan("forged.code", "desk", 2500).await.unwrap();
        assert_eq!(later.status, ScanStatus::Rejected);
    }

    #[tokio::test]
    async fn test_rapid_rescan_debounced() {
        let scanner = scanner(tokens(None));
        assert_eq!(scanner.scan("TC-2025-001", "desk", 0).await.unwrap().status, ScanStatus::Verified);
        assert_eq!(scanner.scan("tc-2025-001", "desk", 500).await.unwrap().status, ScanStatus::Debounced);
        assert_eq!(scanner.scan("TC-2025-002", "desk", 800).await.unwrap().status, ScanStatus::Debounced);
        assert_eq!(scanner.scan("TC-2025-002", "desk", 1300).await.unwrap().status, ScanStatus::Verified);
    }
}
