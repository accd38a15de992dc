//! Error types for admission operations

/// Errors from the shared counter store. These never propagate to a
/// caller: the controller logs them and degrades to the local window.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("counter store connection failed: {0}")]
    Connect(String),

    #[error("counter store error: {0}")]
    Store(String),
}

/// Result alias for admission operations.
pub type Result<T> = std::result::Result<T, Error>;
