use super::{RosterEntry, RosterSource};
use crate::error::RosterError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Roster stored as one JSON array under a single Redis key.
///
/// A replacement is a single `SET`, so concurrent readers never observe a
/// half-written roster.
#[derive(Clone)]
pub struct RedisRosterSource {
    conn: ConnectionManager,
    key: String,
}

impl RedisRosterSource {
    /// Source reading and writing `key`.
    #[must_use]
    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl RosterSource for RedisRosterSource {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn load(&self) -> Result<Vec<RosterEntry>, RosterError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(&self.key).await?;
        match value {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn store(&self, entries: &[RosterEntry]) -> Result<(), RosterError> {
        let json = serde_json::to_string(entries)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&self.key, json).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), RosterError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&self.key).await?;
        Ok(())
    }
}
