//! Common error types

use thiserror::Error;

/// Errors shared across the workspace: configuration loading and
/// validation failures surfaced before the gateway starts serving.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_detail() {
        let err = Error::Config("OCR_ACCOUNTS is empty".into());
        assert_eq!(err.to_string(), "Configuration error: OCR_ACCOUNTS is empty");
    }

    #[test]
    fn io_error_converts_and_displays() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "config file not found",
        ));
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn error_debug_includes_variant() {
        let err = Error::Config("bad limit".into());
        let debug = format!("{err:?}");
        assert!(debug.contains("Config"), "got: {debug}");
    }
}
