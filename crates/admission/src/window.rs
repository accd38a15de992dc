//! Process-local sliding window for degraded mode
//!
//! When the shared store is unreachable the controller cannot enforce
//! daily quotas; this window only guards against abusive bursts, trading
//! quota fairness for availability. State is per-process and initialized
//! empty at start.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding window of success timestamps per caller id.
pub struct BurstWindow {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl BurstWindow {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the caller is below the burst limit for the trailing window.
    /// Read-only apart from pruning expired timestamps.
    pub fn admits(&self, caller_id: &str) -> bool {
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        let Some(timestamps) = hits.get_mut(caller_id) else {
            return true;
        };
        Self::prune(timestamps, Instant::now(), self.window);
        if timestamps.is_empty() {
            hits.remove(caller_id);
            return true;
        }
        timestamps.len() < self.limit
    }

    /// Record one hit for the caller.
    pub fn record(&self, caller_id: &str) {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        let timestamps = hits.entry(caller_id.to_owned()).or_default();
        Self::prune(timestamps, now, self.window);
        timestamps.push(now);
    }

    fn prune(timestamps: &mut Vec<Instant>, now: Instant, window: Duration) {
        // checked_sub: the process may be younger than the window.
        if let Some(cutoff) = now.checked_sub(window) {
            timestamps.retain(|t| *t > cutoff);
        }
    }
}
