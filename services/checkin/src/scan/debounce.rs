use crate::identifier::NormalizedId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
struct LastScan {
    key: NormalizedId,
    at_millis: i64,
}

/// Drops camera re-reads before they reach the ledger.
///
/// Per station: nothing is admitted within `min_interval` of the previous
/// admitted scan, and the same identifier is not admitted again within
/// `repeat_window`. Suppressed scans do not move the window.
#[derive(Debug)]
pub struct ScanDebouncer {
    min_interval_millis: i64,
    repeat_window_millis: i64,
    last: Mutex<HashMap<String, LastScan>>,
}

impl ScanDebouncer {
    /// Debouncer with the given windows.
    #[must_use]
    pub fn new(min_interval: Duration, repeat_window: Duration) -> Self {
        Self {
            min_interval_millis: i64::try_from(min_interval.as_millis()).unwrap_or(i64::MAX),
            repeat_window_millis: i64::try_from(repeat_window.as_millis()).unwrap_or(i64::MAX),
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a scan of `key` at `station` would go through. Records nothing.
    #[must_use]
    pub fn check(&self, station: &str, key: &NormalizedId, now_millis: i64) -> bool {
        let last = self.last.lock();
        let Some(prev) = last.get(station) else {
            return true;
        };
        let elapsed = now_millis.saturating_sub(prev.at_millis);
        // A clock step backwards counts as a fresh window.
        if elapsed < 0 {
            return true;
        }
        if elapsed < self.min_interval_millis {
            return false;
        }
        !(prev.key == *key && elapsed < self.repeat_window_millis)
    }

    /// Make `key` the last handled scan at `station`.
    ///
    /// Called once the scan has been fully processed, so a scan that failed
    /// downstream does not hold the window against its retry.
    pub fn record(&self, station: &str, key: &NormalizedId, now_millis: i64) {
        self.last.lock().insert(
            station.to_string(),
            LastScan {
                key: key.clone(),
                at_millis: now_millis,
            },
        );
    }

    /// [`check`](Self::check) and, if admitted, [`record`](Self::record).
    pub fn admit(&self, station: &str, key: &NormalizedId, now_millis: i64) -> bool {
        let mut last = self.last.lock();
        if let Some(prev) = last.get(station) {
            let elapsed = now_millis.saturating_sub(prev.at_millis);
            if elapsed >= 0
                && (elapsed < self.min_interval_millis
                    || (prev.key == *key && elapsed < self.repeat_window_millis))
            {
                return false;
            }
        }
        last.insert(
            station.to_string(),
            LastScan {
                key: key.clone(),
                at_millis: now_millis,
            },
        );
        true
    }

    /// Forget every station's history.
    pub fn reset(&self) {
        self.last.lock().clear();
    }
}
