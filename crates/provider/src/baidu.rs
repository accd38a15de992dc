//! Baidu OCR client — the concrete `Recognizer`
//!
//! One form-encoded POST per attempt to the mode-specific endpoint, with the
//! access token as a query parameter. The provider signals failures in the
//! JSON body (`error_code`/`error_msg`) rather than the HTTP status, so the
//! body is decoded regardless of status and classification happens upstream
//! in the dispatch strategy.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::{Mode, ProviderError, Recognition, Recognizer, Result};

/// Recognition call timeout. The exchange is blocking I/O with a fixed
/// short deadline; a request suspends only at this boundary.
const RECOGNIZE_TIMEOUT: Duration = Duration::from_secs(10);

/// Baidu OCR client over a shared `reqwest::Client`.
pub struct BaiduOcr {
    client: reqwest::Client,
    base_url: String,
}

impl BaiduOcr {
    /// `base_url` is the provider origin, e.g. `https://aip.baidubce.com`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, mode: Mode) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            mode.endpoint_path()
        )
    }
}

impl Recognizer for BaiduOcr {
    fn id(&self) -> &str {
        "baidu"
    }

    fn recognize<'a>(
        &'a self,
        mode: Mode,
        token: &'a str,
        image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Recognition>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoint(mode);

            let mut form: Vec<(&str, &str)> = vec![("image", image)];
            form.extend_from_slice(mode.form_params());

            debug!(mode = mode.as_str(), url = %url, "provider recognition call");

            let response = self
                .client
                .post(&url)
                .query(&[("access_token", token)])
                .header(reqwest::header::ACCEPT, "application/json")
                .form(&form)
                .timeout(RECOGNIZE_TIMEOUT)
                .send()
                .await
                .map_err(|e| ProviderError::Http(format!("{} request failed: {e}", mode.as_str())))?;

            let body = response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| ProviderError::Decode(format!("{} response: {e}", mode.as_str())))?;

            Ok(Recognition::new(body))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_mode_path() {
        let ocr = BaiduOcr::new(reqwest::Client::new(), "https://aip.baidubce.com");
        assert_eq!(
            ocr.endpoint(Mode::Table),
            "https://aip.baidubce.com/rest/2.0/ocr/v1/table"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let ocr = BaiduOcr::new(reqwest::Client::new(), "https://aip.baidubce.com/");
        assert_eq!(
            ocr.endpoint(Mode::Basic),
            "https://aip.baidubce.com/rest/2.0/ocr/v1/accurate_basic"
        );
    }

    #[test]
    fn recognizer_id_is_baidu() {
        let ocr = BaiduOcr::new(reqwest::Client::new(), "https://aip.baidubce.com");
        assert_eq!(ocr.id(), "baidu");
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_http_error() {
        // Nothing listens on this port; the call must fail at the transport
        // level, not panic or hang past the timeout.
        let ocr = BaiduOcr::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let result = ocr.recognize(Mode::Basic, "tok", "aW1n").await;
        assert!(matches!(result, Err(ProviderError::Http(_))));
    }
}
