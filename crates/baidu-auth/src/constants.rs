//! Credential exchange constants
//!
//! Endpoint path and timing parameters for the Baidu OAuth-style token
//! exchange. None of these are secrets — the credentials themselves live
//! in `Account` and the cache.

use std::time::Duration;

/// Token endpoint path, relative to the provider base URL.
pub const TOKEN_ENDPOINT_PATH: &str = "/oauth/2.0/token";

/// Credential exchange timeout.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Remaining lifetime below which a cached token is refreshed early.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(600);

/// Assumed token lifetime when the provider omits `expires_in` (30 days).
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 2_592_000;
