//! Remote roster with a local cache behind it.

use super::{RosterEntry, RosterSource};
use crate::error::RosterError;
use crate::metrics;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Primary source with a cache fallback.
///
/// Loads try the primary first and write a successful answer through to
/// the cache; if the primary fails, the cache answers and the roster is
/// marked degraded until the primary responds again. Stores must reach the
/// primary; the cache copy is best effort. With no primary at all (the
/// remote store was unreachable at startup) the cache answers everything
/// and the roster stays degraded.
pub struct FallbackRoster {
    primary: Option<Arc<dyn RosterSource>>,
    cache: Arc<dyn RosterSource>,
    degraded: AtomicBool,
}

impl FallbackRoster {
    /// Primary backed by `cache`.
    #[must_use]
    pub fn new(primary: Arc<dyn RosterSource>, cache: Arc<dyn RosterSource>) -> Self {
        Self {
            primary: Some(primary),
            cache,
            degraded: AtomicBool::new(false),
        }
    }

    /// Cache only; reported as degraded.
    #[must_use]
    pub fn cache_only(cache: Arc<dyn RosterSource>) -> Self {
        Self {
            primary: None,
            cache,
            degraded: AtomicBool::new(true),
        }
    }

    fn set_degraded(&self, degraded: bool) {
        let was = self.degraded.swap(degraded, Ordering::Relaxed);
        if was && !degraded {
            info!("Primary roster store recovered");
        }
    }
}

#[async_trait]
impl RosterSource for FallbackRoster {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn load(&self) -> Result<Vec<RosterEntry>, RosterError> {
        if let Some(primary) = &self.primary {
            match primary.load().await {
                Ok(entries) => {
                    metrics::record_roster_load(primary.name(), "success");
                    self.set_degraded(false);
                    if let Err(e) = self.cache.store(&entries).await {
                        warn!(error = %e, "Failed to refresh roster cache");
                    }
                    return Ok(entries);
                }
                Err(e) => {
                    metrics::record_roster_load(primary.name(), "error");
                    warn!(source = primary.name(), error = %e, "Primary roster store failed, using cache");
                    self.set_degraded(true);
                }
            }
        }

        let result = self.cache.load().await;
        metrics::record_roster_load(
            self.cache.name(),
            if result.is_ok() { "success" } else { "error" },
        );
        result
    }

    async fn store(&self, entries: &[RosterEntry]) -> Result<(), RosterError> {
        let primary = self
            .primary
            .as_ref()
            .ok_or_else(|| RosterError::storage("primary roster store unavailable"))?;
        primary.store(entries).await?;
        self.set_degraded(false);

        if let Err(e) = self.cache.store(entries).await {
            warn!(error = %e, "Failed to update roster cache");
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), RosterError> {
        let primary = self
            .primary
            .as_ref()
            .ok_or_else(|| RosterError::storage("primary roster store unavailable"))?;
        primary.clear().await?;

        if let Err(e) = self.cache.clear().await {
            warn!(error = %e, "Failed to clear roster cache");
        }
        Ok(())
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::FileRosterSource;
    use parking_lot::Mutex;

    /// In-memory source that can be switched off.
    #[derive(Default)]
    struct Flaky {
        entries: Mutex<Vec<RosterEntry>>,
        down: AtomicBool,
    }

    impl Flaky {
        fn check(&self) -> Result<(), RosterError> {
            if self.down.load(Ordering::Relaxed) {
                Err(RosterError::storage("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RosterSource for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }
        async fn load(&self) -> Result<Vec<RosterEntry>, RosterError> {
            self.check()?;
            Ok(self.entries.lock().clone())
        }
        async fn store(&self, entries: &[RosterEntry]) -> Result<(), RosterError> {
            self.check()?;
            *self.entries.lock() = entries.to_vec();
            Ok(())
        }
        async fn clear(&self) -> Result<(), RosterError> {
            self.check()?;
            self.entries.lock().clear();
            Ok(())
        }
    }

    fn fixture() -> (Arc<Flaky>, Arc<FileRosterSource>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FileRosterSource::new(dir.path().join("members.json")));
        (Arc::new(Flaky::default()), cache, dir)
    }

    #[tokio::test]
    async fn test_primary_load_refreshes_cache() {
        let (primary, cache, _dir) = fixture();
        *primary.entries.lock() = vec![RosterEntry::new("Ada", "TC-1")];
        let roster = FallbackRoster::new(primary.clone(), cache.clone());

        assert_eq!(roster.load().await.unwrap().len(), 1);
        assert!(!roster.is_degraded());
        assert_eq!(cache.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_cache_and_recovers() {
        let (primary, cache, _dir) = fixture();
        cache.store(&[RosterEntry::new("Cached", "TC-9")]).await.unwrap();
        primary.down.store(true, Ordering::Relaxed);
        let roster = FallbackRoster::new(primary.clone(), cache);

        let entries = roster.load().await.unwrap();
        assert_eq!(entries[0].name, "Cached");
        assert!(roster.is_degraded());

        primary.down.store(false, Ordering::Relaxed);
        roster.load().await.unwrap();
        assert!(!roster.is_degraded());
    }

    #[tokio::test]
    async fn test_store_requires_primary() {
        let (primary, cache, _dir) = fixture();
        primary.down.store(true, Ordering::Relaxed);
        let roster = FallbackRoster::new(primary, cache.clone());

        let result = roster.store(&[RosterEntry::new("A", "1")]).await;
        assert!(matches!(result, Err(RosterError::Storage(_))));
        assert!(cache.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_only_is_degraded() {
        let (_, cache, _dir) = fixture();
        let roster = FallbackRoster::cache_only(cache);
        assert!(roster.is_degraded());
        assert!(roster.load().await.unwrap().is_empty());
        assert!(roster.store(&[]).await.is_err());
    }
}
