//! Verification ledger.
//!
//! One record per participant, written on the first successful scan and
//! never updated afterwards. Replays report the original record so the
//! first check-in time survives for audit.

pub mod redis;
pub mod store;

pub use self::redis::RedisLedgerStore;
pub use store::{Insertion, LedgerStore, MemoryLedgerStore};

use crate::error::LedgerError;
use crate::identifier::NormalizedId;
use crate::roster::RosterLookup;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A first-verification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// Identifier in the roster's stored casing
    pub identifier: String,
    /// When the participant was first verified
    pub verified_at_millis: i64,
}

/// Outcome of applying one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The participant was unverified and is now verified.
    FirstVerification(VerificationRecord),
    /// The participant was already verified; the original record.
    AlreadyVerified(VerificationRecord),
    /// No roster entry matches. Not an error.
    NotFound {
        /// The scanned identifier, trimmed
        identifier: String,
    },
}

impl ScanOutcome {
    /// Metric and log label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FirstVerification(_) => "verified",
            Self::AlreadyVerified(_) => "already_verified",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// Record behind the outcome, if any.
    #[must_use]
    pub fn record(&self) -> Option<&VerificationRecord> {
        match self {
            Self::FirstVerification(r) | Self::AlreadyVerified(r) => Some(r),
            Self::NotFound { .. } => None,
        }
    }
}

/// Idempotent scan application over a [`LedgerStore`].
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    write_lock: Mutex<()>,
}

impl Ledger {
    /// Ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Ledger that lives in process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedgerStore::new()))
    }

    /// Apply a scan of `raw` at `now_millis`.
    ///
    /// Check, lookup and insert run under one lock, so two concurrent scans
    /// of a never-seen identifier cannot both report a first verification.
    /// An unknown identifier never creates a record.
    ///
    /// # Errors
    ///
    /// Propagates store failures; nothing is written when one occurs.
    pub async fn apply_scan(
        &self,
        raw: &str,
        roster: &dyn RosterLookup,
        now_millis: i64,
    ) -> Result<ScanOutcome, LedgerError> {
        let key = NormalizedId::new(raw);
        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.store.get(&key).await? {
            debug!(identifier = %existing.identifier, "Replay of verified participant");
            return Ok(ScanOutcome::AlreadyVerified(existing));
        }

        let Some(entry) = roster.lookup(&key) else {
            debug!(identifier = %key, "Scanned identifier not on roster");
            return Ok(ScanOutcome::NotFound {
                identifier: raw.trim().to_string(),
            });
        };

        let record = VerificationRecord {
            identifier: entry.enrollment_number,
            verified_at_millis: now_millis,
        };
        match self.store.insert_if_absent(&key, record).await? {
            Insertion::Inserted(record) => {
                info!(
                    identifier = %record.identifier,
                    verified_at = record.verified_at_millis,
                    "Participant verified"
                );
                Ok(ScanOutcome::FirstVerification(record))
            }
            Insertion::Existing(record) => Ok(ScanOutcome::AlreadyVerified(record)),
        }
    }

    /// Record for `raw`, if verified.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, raw: &str) -> Result<Option<VerificationRecord>, LedgerError> {
        self.store.get(&NormalizedId::new(raw)).await
    }

    /// Every record, most recent first; equal timestamps order by identifier.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn history(&self) -> Result<Vec<VerificationRecord>, LedgerError> {
        let mut records = self.store.all().await?;
        records.sort_by(|a, b| {
            b.verified_at_millis
                .cmp(&a.verified_at_millis)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        Ok(records)
    }

    /// Number of verified participants.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.store.all().await?.len())
    }

    /// Operator reset: forget every verification.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn clear(&self) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.store.clear().await?;
        info!("Verification ledger cleared");
        Ok(())
    }
}
