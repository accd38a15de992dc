//! Shared counter store
//!
//! The `CounterStore` trait is the seam between the controller and Redis:
//! three primitive operations, each a single round trip. Increments must be
//! atomic at the store since many concurrent requests race on the same key;
//! expiry is a separate, idempotent call.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn CounterStore>`), so controller tests run against an in-memory
//! scripted store.

use std::future::Future;
use std::pin::Pin;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

/// Minimal counter operations the admission controller needs.
pub trait CounterStore: Send + Sync {
    /// Read a counter. Absent keys read as `None` (the controller treats
    /// that as zero).
    fn get<'a>(&'a self, key: &'a str)
    -> Pin<Box<dyn Future<Output = Result<Option<u64>>> + Send + 'a>>;

    /// Atomically increment a counter, returning the new value.
    fn incr<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>>;

    /// (Re)set a key's time-to-live.
    fn expire<'a>(
        &'a self,
        key: &'a str,
        ttl_secs: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Redis-backed counter store over a multiplexed connection manager.
///
/// The manager reconnects on its own after transient failures; individual
/// operations during an outage return errors, which the controller turns
/// into degraded-mode decisions.
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379/0` or a
    /// `rediss://` managed instance).
    pub async fn connect(url: &str) -> Result<Self> {
        let client =
            redis::Client::open(url).map_err(|e| Error::Connect(format!("invalid URL: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;
        info!("counter store connected");
        Ok(Self { manager })
    }
}

impl CounterStore for RedisCounterStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<u64>>> + Send + 'a>> {
        let mut conn = self.manager.clone();
        Box::pin(async move {
            let value: Option<u64> = conn
                .get(key)
                .await
                .map_err(|e| Error::Store(format!("GET {key}: {e}")))?;
            Ok(value)
        })
    }

    fn incr<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>> {
        let mut conn = self.manager.clone();
        Box::pin(async move {
            let value: u64 = conn
                .incr(key, 1u64)
                .await
                .map_err(|e| Error::Store(format!("INCR {key}: {e}")))?;
            Ok(value)
        })
    }

    fn expire<'a>(
        &'a self,
        key: &'a str,
        ttl_secs: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let mut conn = self.manager.clone();
        Box::pin(async move {
            let _: bool = conn
                .expire(key, ttl_secs as i64)
                .await
                .map_err(|e| Error::Store(format!("EXPIRE {key}: {e}")))?;
            Ok(())
        })
    }
}
