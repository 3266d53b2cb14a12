use super::RosterEntry;
use crate::error::RosterError;
use async_trait::async_trait;

/// Where a roster is loaded from and persisted to.
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Load every entry.
    async fn load(&self) -> Result<Vec<RosterEntry>, RosterError>;

    /// Replace the stored roster with `entries`.
    async fn store(&self, entries: &[RosterEntry]) -> Result<(), RosterError>;

    /// Remove the stored roster.
    async fn clear(&self) -> Result<(), RosterError>;

    /// True while answers come from a fallback rather than the primary store.
    fn is_degraded(&self) -> bool {
        false
    }
}
