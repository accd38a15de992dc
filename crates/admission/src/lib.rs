//! Admission control: per-caller and global daily quotas
//!
//! Quota is deliberately split into two operations so it is never charged
//! for calls that produce no provider-accepted output:
//! 1. `AdmissionController::check()` — read-only, before any provider call
//! 2. `AdmissionController::record_success()` — exactly once per
//!    successful recognition
//!
//! Counters live in a shared Redis store keyed by scope and day
//! (`usage:device:{caller}:{date}`, `usage:global:{date}`) with a 24h
//! expiry, plus a non-expiring lifetime total. Increments are atomic single
//! operations at the store; expiry-setting is idempotent and repeated.
//!
//! When the store is unreachable the controller degrades to a
//! process-local sliding window per caller — a flood guard, not a quota.
//! Store failures are logged and never fail a request; recovery is
//! automatic on the next successful store access, with no reconciliation
//! of counts missed during the outage.

pub mod controller;
pub mod error;
pub mod store;
pub mod window;

pub use controller::{AdmissionController, Limits};
pub use error::{Error, Result};
pub use store::{CounterStore, RedisCounterStore};
pub use window::BurstWindow;
