//! Provider abstraction for the upstream OCR service
//!
//! Defines the recognition modes, the raw provider response wrapper, and the
//! `Recognizer` trait that decouples the dispatch strategy from the concrete
//! Baidu client. The dispatch core inspects only the presence/value of the
//! provider error code, never the payload contents — layout formatting is a
//! downstream collaborator.

pub mod baidu;

pub use baidu::BaiduOcr;

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// A provider recognition variant. Each mode maps to a distinct endpoint,
/// a fixed parameter set, and its own quota bucket at the provider.
///
/// Preference order for the fallback chain is `Table`, `Accurate`, `Basic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Table,
    Accurate,
    Basic,
}

/// Full descending-preference chain.
pub const MODE_CHAIN: [Mode; 3] = [Mode::Table, Mode::Accurate, Mode::Basic];

impl Mode {
    /// Wire/label name, also the prefix of the `strategy_used` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Table => "table",
            Mode::Accurate => "accurate",
            Mode::Basic => "basic",
        }
    }

    /// Provider endpoint path for this mode.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Mode::Table => "/rest/2.0/ocr/v1/table",
            Mode::Accurate => "/rest/2.0/ocr/v1/accurate",
            Mode::Basic => "/rest/2.0/ocr/v1/accurate_basic",
        }
    }

    /// Fixed recognition parameters sent alongside the image for this mode.
    pub fn form_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Mode::Table => &[("cell_contents", "false"), ("return_excel", "false")],
            Mode::Accurate => &[
                ("detect_direction", "false"),
                ("vertexes_location", "false"),
                ("paragraph", "false"),
            ],
            Mode::Basic => &[("detect_direction", "false")],
        }
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "table" => Ok(Mode::Table),
            "accurate" => Ok(Mode::Accurate),
            "basic" => Ok(Mode::Basic),
            other => Err(UnknownMode(other.to_owned())),
        }
    }
}

/// Returned when a forced-mode selector names no known mode.
#[derive(Debug, thiserror::Error)]
#[error("unknown recognition mode: {0}")]
pub struct UnknownMode(pub String);

/// Raw provider response. Success responses carry the recognition payload;
/// failures carry `error_code`/`error_msg` at the top level.
#[derive(Debug, Clone)]
pub struct Recognition(serde_json::Value);

impl Recognition {
    pub fn new(body: serde_json::Value) -> Self {
        Self(body)
    }

    /// Provider error code, if present. Absent or zero means success.
    pub fn error_code(&self) -> Option<i64> {
        self.0.get("error_code").and_then(serde_json::Value::as_i64)
    }

    /// Provider error message, if present.
    pub fn error_message(&self) -> Option<&str> {
        self.0.get("error_msg").and_then(serde_json::Value::as_str)
    }

    /// Whether the provider accepted the image (no error code, or code 0).
    pub fn is_success(&self) -> bool {
        matches!(self.error_code(), None | Some(0))
    }

    /// The raw payload, passed through to the caller untouched.
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

/// Classification of a provider error code, driving the fallback decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate/quota limit on this (mode, account) pair — try the next pair
    Retryable,
    /// Defect not specific to the pair (bad image, invalid credential) —
    /// further attempts are pointless, abort the chain
    NonRetryable,
}

/// Errors from the provider transport itself (the call never produced a
/// provider-level response).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(String),

    #[error("provider response was not JSON: {0}")]
    Decode(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// One blocking recognition call per attempt against the provider.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Recognizer>`), so the dispatch strategy can be exercised
/// against a scripted implementation in tests.
pub trait Recognizer: Send + Sync {
    /// Identifier for logging (e.g. "baidu")
    fn id(&self) -> &str;

    /// Perform one recognition call for (mode, token, image).
    fn recognize<'a>(
        &'a self,
        mode: Mode,
        token: &'a str,
        image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Recognition>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_chain_is_descending_preference() {
        assert_eq!(MODE_CHAIN, [Mode::Table, Mode::Accurate, Mode::Basic]);
    }

    #[test]
    fn mode_parses_known_names() {
        assert_eq!("table".parse::<Mode>().unwrap(), Mode::Table);
        assert_eq!("accurate".parse::<Mode>().unwrap(), Mode::Accurate);
        assert_eq!("basic".parse::<Mode>().unwrap(), Mode::Basic);
    }

    #[test]
    fn mode_rejects_unknown_name() {
        let err = "handwriting".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("handwriting"));
    }

    #[test]
    fn mode_endpoints_are_distinct() {
        assert_eq!(Mode::Table.endpoint_path(), "/rest/2.0/ocr/v1/table");
        assert_eq!(Mode::Accurate.endpoint_path(), "/rest/2.0/ocr/v1/accurate");
        assert_eq!(Mode::Basic.endpoint_path(), "/rest/2.0/ocr/v1/accurate_basic");
    }

    #[test]
    fn accurate_params_disable_geometry_extras() {
        let params = Mode::Accurate.form_params();
        assert!(params.contains(&("detect_direction", "false")));
        assert!(params.contains(&("vertexes_location", "false")));
        assert!(params.contains(&("paragraph", "false")));
    }

    #[test]
    fn recognition_without_error_code_is_success() {
        let r = Recognition::new(json!({"words_result": []}));
        assert!(r.is_success());
        assert_eq!(r.error_code(), None);
    }

    #[test]
    fn recognition_with_zero_error_code_is_success() {
        let r = Recognition::new(json!({"error_code": 0}));
        assert!(r.is_success());
    }

    #[test]
    fn recognition_with_error_code_is_failure() {
        let r = Recognition::new(json!({
            "error_code": 17,
            "error_msg": "Open api daily request limit reached"
        }));
        assert!(!r.is_success());
        assert_eq!(r.error_code(), Some(17));
        assert_eq!(
            r.error_message(),
            Some("Open api daily request limit reached")
        );
    }

    #[test]
    fn into_inner_passes_payload_through_untouched() {
        let body = json!({"words_result": [{"words": "hello"}], "words_result_num": 1});
        let r = Recognition::new(body.clone());
        assert_eq!(r.into_inner(), body);
    }
}
