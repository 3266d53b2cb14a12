use super::store::{Insertion, LedgerStore};
use super::VerificationRecord;
use crate::error::LedgerError;
use crate::identifier::NormalizedId;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Ledger kept in one Redis hash, field = normalized identifier.
///
/// `HSETNX` makes the first-verification decision atomic across every
/// station and replica sharing the hash.
#[derive(Clone)]
pub struct RedisLedgerStore {
    conn: ConnectionManager,
    key: String,
}

impl RedisLedgerStore {
    /// Store using the hash at `key`.
    #[must_use]
    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl LedgerStore for RedisLedgerStore {
    async fn get(&self, key: &NormalizedId) -> Result<Option<VerificationRecord>, LedgerError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(&self.key, key.as_str()).await?;
        value
            .map(|json| serde_json::from_str::<VerificationRecord>(&json))
            .transpose()
            .map_err(Into::into)
    }

    async fn insert_if_absent(
        &self,
        key: &NormalizedId,
        record: VerificationRecord,
    ) -> Result<Insertion, LedgerError> {
        let json = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();
        let inserted: bool = conn.hset_nx(&self.key, key.as_str(), json).await?;
        if inserted {
            return Ok(Insertion::Inserted(record));
        }

        match self.get(key).await? {
            Some(existing) => Ok(Insertion::Existing(existing)),
            // Cleared between HSETNX and HGET.
            None => Err(LedgerError::Storage(format!(
                "record for {key} vanished during insert"
            ))),
        }
    }

    async fn all(&self) -> Result<Vec<VerificationRecord>, LedgerError> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = conn.hvals(&self.key).await?;
        values
            .iter()
            .map(|json| serde_json::from_str::<VerificationRecord>(json).map_err(Into::into))
            .collect()
    }

    async fn clear(&self) -> Result<(), LedgerError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&self.key).await?;
        Ok(())
    }
}
