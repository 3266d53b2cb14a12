//! Storage behind the verification ledger.

use super::VerificationRecord;
use crate::error::LedgerError;
use crate::identifier::NormalizedId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Result of a conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// The record was written.
    Inserted(VerificationRecord),
    /// A record already existed and was left untouched.
    Existing(VerificationRecord),
}

/// Keyed store of verification records.
///
/// `insert_if_absent` must be atomic per key: of any number of concurrent
/// inserts for one key exactly one sees [`Insertion::Inserted`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Record for `key`, if any.
    async fn get(&self, key: &NormalizedId) -> Result<Option<VerificationRecord>, LedgerError>;

    /// Write `record` under `key` unless a record is already there.
    async fn insert_if_absent(
        &self,
        key: &NormalizedId,
        record: VerificationRecord,
    ) -> Result<Insertion, LedgerError>;

    /// Every record, in no particular order.
    async fn all(&self) -> Result<Vec<VerificationRecord>, LedgerError>;

    /// Drop every record.
    async fn clear(&self) -> Result<(), LedgerError>;
}

/// Process-local store. Records live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    records: Mutex<HashMap<NormalizedId, VerificationRecord>>,
}

impl MemoryLedgerStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get(&self, key: &NormalizedId) -> Result<Option<VerificationRecord>, LedgerError> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn insert_if_absent(
        &self,
        key: &NormalizedId,
        record: VerificationRecord,
    ) -> Result<Insertion, LedgerError> {
        let mut records = self.records.lock();
        if let Some(existing) = records.get(key) {
            return Ok(Insertion::Existing(existing.clone()));
        }
        records.insert(key.clone(), record.clone());
        Ok(Insertion::Inserted(record))
    }

    async fn all(&self) -> Result<Vec<VerificationRecord>, LedgerError> {
        Ok(self.records.lock().values().cloned().collect())
    }

    async fn clear(&self) -> Result<(), LedgerError> {
        self.records.lock().clear();
        Ok(())
    }
}
