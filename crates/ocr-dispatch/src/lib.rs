//! Fallback dispatch over (mode, account) pairs
//!
//! Owns the ordered attempt sequence, invokes the provider via the token
//! cache, classifies each result, and decides continue-vs-abort. One
//! request's attempts run sequentially: a failed attempt's classification
//! must be observed before trying the next pair, and speculative parallel
//! attempts would waste quota on doomed calls.
//!
//! Per-invocation state machine:
//! `Start → { Attempt → (Success | Retryable → next pair |
//! NonRetryable | Failed → next pair | Skipped → next pair) }
//! → (Exhausted | NoAccounts)`
//! where Success and NonRetryable are terminal.

pub mod classify;
pub mod strategy;

pub use classify::{classify_code, suggestion_for};
pub use strategy::{AttemptOutcome, DispatchFailure, DispatchSuccess, Strategy};
