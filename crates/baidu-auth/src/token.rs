//! Client-credentials token exchange
//!
//! The provider issues access tokens against an OAuth-style endpoint: one
//! POST with the account's access key and secret key. The exchange sits
//! behind the `TokenExchange` trait so the cache (and its tests) never
//! depend on the concrete HTTP client.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::constants::{EXCHANGE_TIMEOUT, TOKEN_ENDPOINT_PATH};
use crate::error::{Error, Result};

/// A successfully exchanged token.
///
/// `expires_in` is a delta in seconds from the response time; the cache
/// converts it to an absolute deadline when storing. `None` means the
/// provider omitted it and the default lifetime applies.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// Wire shape of the token endpoint response. Failure responses carry
/// `error`/`error_description` instead of a token.
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Credential exchange seam.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TokenExchange>`), letting tests count exchange calls with a
/// scripted implementation.
pub trait TokenExchange: Send + Sync {
    fn exchange<'a>(
        &'a self,
        access_key: &'a str,
        secret_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send + 'a>>;
}

/// The real exchange against the provider's token endpoint.
pub struct BaiduTokenExchange {
    client: reqwest::Client,
    base_url: String,
}

impl BaiduTokenExchange {
    /// `base_url` is the provider origin, e.g. `https://aip.baidubce.com`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TOKEN_ENDPOINT_PATH)
    }
}

impl TokenExchange for BaiduTokenExchange {
    fn exchange<'a>(
        &'a self,
        access_key: &'a str,
        secret_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint())
                .query(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", access_key),
                    ("client_secret", secret_key),
                ])
                .timeout(EXCHANGE_TIMEOUT)
                .send()
                .await
                .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<no body>"));
                return Err(Error::Exchange(format!(
                    "token endpoint returned {status}: {body}"
                )));
            }

            let raw = response
                .json::<RawTokenResponse>()
                .await
                .map_err(|e| Error::Exchange(format!("invalid token response: {e}")))?;

            match raw.access_token {
                Some(access_token) => Ok(TokenResponse {
                    access_token,
                    expires_in: raw.expires_in,
                }),
                None => Err(Error::MissingToken(
                    raw.error_description
                        .or(raw.error)
                        .unwrap_or_else(|| "no error detail".into()),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_response_deserializes_success_shape() {
        let json = r#"{"access_token":"24.abc","expires_in":2592000,"scope":"public"}"#;
        let raw: RawTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(raw.access_token.as_deref(), Some("24.abc"));
        assert_eq!(raw.expires_in, Some(2592000));
    }

    #[test]
    fn raw_response_deserializes_error_shape() {
        let json = r#"{"error":"invalid_client","error_description":"unknown client id"}"#;
        let raw: RawTokenResponse = serde_json::from_str(json).unwrap();
        assert!(raw.access_token.is_none());
        assert_eq!(raw.error_description.as_deref(), Some("unknown client id"));
    }

    #[test]
    fn endpoint_joins_base_url_and_path() {
        let exchange = BaiduTokenExchange::new(reqwest::Client::new(), "https://aip.baidubce.com/");
        assert_eq!(exchange.endpoint(), "https://aip.baidubce.com/oauth/2.0/token");
    }

    #[tokio::test]
    async fn transport_failure_returns_http_error() {
        // Nothing listens on this port; the exchange must surface a
        // transport error rather than hang past the 5s timeout.
        let exchange = BaiduTokenExchange::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let result = exchange.exchange("ak", "sk").await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
