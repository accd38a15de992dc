//! Baidu credential handling: accounts, token exchange, token cache
//!
//! Standalone library with no dependency on the gateway binary.
//!
//! Credential flow:
//! 1. Accounts load once at process start from the `ak,sk|ak,sk`
//!    environment format (`account::parse_accounts`) — the account set
//!    never changes during a process lifetime
//! 2. The dispatch strategy asks `TokenCache::token()` for an account's
//!    access token before each attempt
//! 3. A cached token with more than the safety margin of lifetime left is
//!    returned without any network call
//! 4. Otherwise the cache performs a client-credentials exchange via
//!    `TokenExchange` and stores the result (one token per access key,
//!    last write wins)

pub mod account;
pub mod cache;
pub mod constants;
pub mod error;
pub mod token;

pub use account::{Account, parse_accounts};
pub use cache::TokenCache;
pub use constants::*;
pub use error::{Error, Result};
pub use token::{BaiduTokenExchange, TokenExchange, TokenResponse};
