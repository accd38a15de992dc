//! Baidu OCR Gateway
//!
//! Single-binary service that:
//! 1. Loads the account pool and quota limits from config + environment
//! 2. Listens for form-encoded /ocr requests
//! 3. Runs admission control against Redis (degrading to a local window)
//! 4. Dispatches recognition over the (mode, account) fallback chain

mod config;
mod handler;
mod metrics;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admission::{AdmissionController, CounterStore, RedisCounterStore};
use baidu_auth::{BaiduTokenExchange, TokenCache, parse_accounts};
use ocr_dispatch::Strategy;
use provider::BaiduOcr;

use crate::config::Config;
use crate::handler::AppState;

/// Build the axum router with all routes and shared state.
///
/// The concurrency limit layer bounds in-flight requests; excess requests
/// queue rather than shed.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/ocr", post(handler::ocr))
        .route("/health", get(handler::health))
        .route("/metrics", get(handler::metrics))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting baidu-ocr-gateway");

    // Install the Prometheus recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let accounts = parse_accounts(&config.accounts_raw);
    if accounts.is_empty() {
        warn!("no accounts in OCR_ACCOUNTS; every /ocr request will fail as misconfigured");
    }

    info!(
        listen_addr = %config.gateway.listen_addr,
        provider_base_url = %config.gateway.provider_base_url,
        accounts = accounts.len(),
        secret_gate = config.api_secret.is_some(),
        "configuration loaded"
    );

    let client = reqwest::Client::new();
    let exchange = Arc::new(BaiduTokenExchange::new(
        client.clone(),
        config.gateway.provider_base_url.clone(),
    ));
    let tokens = Arc::new(TokenCache::new(exchange));
    let recognizer = Arc::new(BaiduOcr::new(
        client,
        config.gateway.provider_base_url.clone(),
    ));
    let strategy = Arc::new(Strategy::new(accounts, tokens, recognizer));

    // An unreachable store at startup is a config problem and fails fast;
    // outages after startup degrade per-request instead, and the manager
    // reconnects on its own.
    let (store, store_backend): (Option<Arc<dyn CounterStore>>, &'static str) =
        match &config.redis_url {
            Some(url) => {
                let store = RedisCounterStore::connect(url)
                    .await
                    .with_context(|| "failed to connect to the REDIS_URL counter store")?;
                (Some(Arc::new(store)), "redis")
            }
            None => {
                warn!("no REDIS_URL configured, admission control runs on the local burst window");
                (None, "local")
            }
        };

    let admission = Arc::new(AdmissionController::new(store, config.quota.limits()));

    let app_state = AppState {
        strategy,
        admission,
        api_secret: config.api_secret,
        store_backend,
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.gateway.max_connections);

    let listener = TcpListener::bind(config.gateway.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.gateway.listen_addr))?;

    info!(addr = %config.gateway.listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
