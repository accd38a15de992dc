//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Credentials never live in the TOML: the account pool comes from
//! OCR_ACCOUNTS and the shared secret from API_SECRET, so the config file
//! can be committed without leaking keys.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    /// `ak,sk|ak,sk` pool from OCR_ACCOUNTS, never from the TOML
    #[serde(skip)]
    pub accounts_raw: String,
    /// Shared secret from API_SECRET; `None` disables the gate
    #[serde(skip)]
    pub api_secret: Option<Secret<String>>,
    /// Counter store URL from REDIS_URL; `None` runs permanently degraded
    #[serde(skip)]
    pub redis_url: Option<String>,
}

/// HTTP listener and provider settings
#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Daily quota limits and the degraded-mode burst window
#[derive(Debug, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_per_caller_daily")]
    pub per_caller_daily: u64,
    #[serde(default = "default_global_daily")]
    pub global_daily: u64,
    #[serde(default = "default_burst_limit")]
    pub burst_limit: usize,
    #[serde(default = "default_burst_window_secs")]
    pub burst_window_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            per_caller_daily: default_per_caller_daily(),
            global_daily: default_global_daily(),
            burst_limit: default_burst_limit(),
            burst_window_secs: default_burst_window_secs(),
        }
    }
}

impl QuotaConfig {
    pub fn limits(&self) -> admission::Limits {
        admission::Limits {
            per_caller_daily: self.per_caller_daily,
            global_daily: self.global_daily,
            burst_limit: self.burst_limit,
            burst_window: std::time::Duration::from_secs(self.burst_window_secs),
        }
    }
}

fn default_provider_base_url() -> String {
    "https://aip.baidubce.com".to_owned()
}

fn default_max_connections() -> usize {
    1000
}

fn default_per_caller_daily() -> u64 {
    15
}

fn default_global_daily() -> u64 {
    300
}

fn default_burst_limit() -> usize {
    10
}

fn default_burst_window_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables (OCR_ACCOUNTS, API_SECRET, REDIS_URL).
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.gateway.provider_base_url.starts_with("http://")
            && !config.gateway.provider_base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "provider_base_url must start with http:// or https://, got: {}",
                config.gateway.provider_base_url
            )));
        }

        if config.gateway.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.quota.per_caller_daily == 0 || config.quota.global_daily == 0 {
            return Err(common::Error::Config(
                "quota limits must be greater than 0".into(),
            ));
        }

        if config.quota.burst_limit == 0 || config.quota.burst_window_secs == 0 {
            return Err(common::Error::Config(
                "burst_limit and burst_window_secs must be greater than 0".into(),
            ));
        }

        if let Ok(raw) = std::env::var("OCR_ACCOUNTS") {
            config.accounts_raw = raw;
        }

        if let Ok(secret) = std::env::var("API_SECRET") {
            if !secret.is_empty() {
                config.api_secret = Some(Secret::new(secret));
            }
        }

        if let Ok(url) = std::env::var("REDIS_URL") {
            if !url.is_empty() {
                config.redis_url = Some(url);
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("baidu-ocr-gateway.toml")
    }
}
