//! Secret wrapper for credential material

use std::fmt;
use zeroize::Zeroize;

/// Placeholder printed wherever a secret would otherwise leak into
/// logs or error chains.
const REDACTED: &str = "[REDACTED]";

/// Sensitive value (provider secret keys, the shared API secret) —
/// redacted in Debug/Display/logs, zeroized on drop.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly, at the call site that
    /// actually sends it upstream)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_redacted_in_debug() {
        let sk = Secret::new(String::from("SECRET_KEY_B"));
        let debug = format!("{:?}", sk);
        assert_eq!(debug, "[REDACTED]");
        assert!(!debug.contains("SECRET_KEY_B"));
    }

    #[test]
    fn secret_key_redacted_in_display() {
        let sk = Secret::new(String::from("SECRET_KEY_B"));
        assert_eq!(format!("{sk}"), "[REDACTED]");
    }

    #[test]
    fn expose_returns_inner_value() {
        let sk = Secret::new(String::from("SECRET_KEY_B"));
        assert_eq!(sk.expose(), "SECRET_KEY_B");
    }

    #[test]
    fn from_str_wraps_value() {
        let sk: Secret<String> = "my-secret-123".into();
        assert_eq!(sk.expose(), "my-secret-123");
    }
}
