//! Error types for credential operations

/// Errors from token exchange and cache operations. All of these are local
/// to one account: the dispatch strategy treats them as a failed attempt
/// for that (mode, account) pair and moves on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("token response missing access_token: {0}")]
    MissingToken(String),
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;
