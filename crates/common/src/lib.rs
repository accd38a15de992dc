//! Common types for the OCR gateway workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
