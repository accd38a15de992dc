//! In-process token cache
//!
//! One cached token per access key, refreshed lazily before expiry. The
//! cache is process-scoped state initialized empty at start; on
//! multi-process deployments each process keeps its own copy.
//!
//! Concurrent refreshes of the same access key are not mutually excluded:
//! the write lock is taken only to store the result, never across the
//! network call, so racing refreshes overwrite each other and the last
//! write wins. Refreshed tokens are functionally equivalent, making this
//! an efficiency loss rather than a correctness hazard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::account::Account;
use crate::constants::{DEFAULT_EXPIRES_IN_SECS, REFRESH_MARGIN};
use crate::error::Result;
use crate::token::TokenExchange;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Lazily refreshed token cache keyed by access key.
pub struct TokenCache {
    exchanger: Arc<dyn TokenExchange>,
    entries: RwLock<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new(exchanger: Arc<dyn TokenExchange>) -> Self {
        Self {
            exchanger,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the account's access token, exchanging credentials only when
    /// the cached token is absent or inside the refresh margin.
    ///
    /// On exchange failure nothing is cached and the error propagates; the
    /// caller treats the whole (mode, account) attempt as failed and moves
    /// to the next pair.
    pub async fn token(&self, account: &Account) -> Result<String> {
        if let Some(token) = self.fresh(&account.access_key).await {
            return Ok(token);
        }

        debug!(account = %account.label(), "token absent or near expiry, exchanging credentials");
        let response = self
            .exchanger
            .exchange(&account.access_key, account.secret_key.expose())
            .await
            .inspect_err(|e| warn!(account = %account.label(), error = %e, "token exchange failed"))?;

        let lifetime = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = Instant::now() + Duration::from_secs(lifetime);

        // Last write wins under concurrent refresh of the same key.
        self.entries.write().await.insert(
            account.access_key.clone(),
            CachedToken {
                value: response.access_token.clone(),
                expires_at,
            },
        );

        debug!(account = %account.label(), lifetime_secs = lifetime, "token cached");
        Ok(response.access_token)
    }

    /// Cached token with more than the refresh margin of lifetime left.
    async fn fresh(&self, access_key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let entry = entries.get(access_key)?;
        if entry.expires_at > Instant::now() + REFRESH_MARGIN {
            Some(entry.value.clone())
        } else {
            None
        }
    }
}
