//! Admission controller
//!
//! Combines the shared counter store with the local burst window. Global
//! quota is checked before per-caller quota; an empty caller id is
//! unmeterable and always admitted when the store answers. Any store error
//! flips that call to the degraded path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::CounterStore;
use crate::window::BurstWindow;

/// Day-bucketed keys expire after 24 hours; the date in the key rolls the
/// counter over at midnight regardless.
const DAY_TTL_SECS: u64 = 86_400;

/// Lifetime success counter, never expires.
const TOTAL_KEY: &str = "usage:global:total";

/// Quota limits and degraded-mode window parameters.
#[derive(Debug, Clone)]
pub struct Limits {
    pub per_caller_daily: u64,
    pub global_daily: u64,
    pub burst_limit: usize,
    pub burst_window: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            per_caller_daily: 15,
            global_daily: 300,
            burst_limit: 10,
            burst_window: Duration::from_secs(60),
        }
    }
}

/// Tracks per-caller and global usage with a shared store and an
/// in-process fallback.
pub struct AdmissionController {
    store: Option<Arc<dyn CounterStore>>,
    window: BurstWindow,
    limits: Limits,
}

impl AdmissionController {
    /// `store` is `None` when no shared store is configured; the
    /// controller then runs permanently degraded (burst guard only).
    pub fn new(store: Option<Arc<dyn CounterStore>>, limits: Limits) -> Self {
        let window = BurstWindow::new(limits.burst_limit, limits.burst_window);
        Self {
            store,
            window,
            limits,
        }
    }

    /// Read-only admission decision. Never charges quota.
    pub async fn check(&self, caller_id: &str) -> bool {
        if let Some(store) = &self.store {
            match self.check_quota(store.as_ref(), caller_id).await {
                Ok(allowed) => return allowed,
                Err(e) => {
                    warn!(error = %e, "counter store unreachable, falling back to burst window");
                }
            }
        }
        self.window.admits(caller_id)
    }

    /// Charge quota for one successful recognition. Must be invoked
    /// exactly once per success, never for denied or failed attempts.
    /// Store failures are swallowed: they relax quota fairness rather
    /// than failing the request.
    pub async fn record_success(&self, caller_id: &str) {
        if let Some(store) = &self.store {
            match self.record_quota(store.as_ref(), caller_id).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(error = %e, "failed to record usage in counter store");
                }
            }
        }
        self.window.record(caller_id);
    }

    async fn check_quota(&self, store: &dyn CounterStore, caller_id: &str) -> Result<bool> {
        let date = today();

        // Global quota first: one exhausted bucket shuts the whole day.
        let global = store.get(&global_key(&date)).await?.unwrap_or(0);

        if caller_id.is_empty() {
            // Unmeterable caller, admitted while the store answers.
            return Ok(true);
        }

        if global >= self.limits.global_daily {
            info!(
                global,
                limit = self.limits.global_daily,
                "global daily quota exhausted"
            );
            return Ok(false);
        }

        let used = store.get(&device_key(caller_id, &date)).await?.unwrap_or(0);
        if used >= self.limits.per_caller_daily {
            info!(
                caller_id,
                used,
                limit = self.limits.per_caller_daily,
                "per-caller daily quota exhausted"
            );
            return Ok(false);
        }

        Ok(true)
    }

    async fn record_quota(&self, store: &dyn CounterStore, caller_id: &str) -> Result<()> {
        let date = today();

        if !caller_id.is_empty() {
            let key = device_key(caller_id, &date);
            let used = store.incr(&key).await?;
            store.expire(&key, DAY_TTL_SECS).await?;
            debug!(caller_id, used, "per-caller usage recorded");
        }

        let key = global_key(&date);
        store.incr(&key).await?;
        store.expire(&key, DAY_TTL_SECS).await?;

        store.incr(TOTAL_KEY).await?;
        Ok(())
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn device_key(caller_id: &str, date: &str) -> String {
    format!("usage:device:{caller_id}:{date}")
}

fn global_key(date: &str) -> String {
    format!("usage:global:{date}")
}
