//! Request handlers
//!
//! `/ocr` runs the admission-then-dispatch pipeline: shared-secret gate,
//! request-shape validation, admission check, fallback dispatch, and usage
//! recording (successes only). Every failure mode maps to a JSON body with
//! `status`, `error_code`, `error_message`, and `suggestion`; gateway-local
//! rejections use negative codes (-4 bad secret, -5 bad shape, -2 admission
//! denied) so they never collide with provider codes.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::Secret;
use metrics_exporter_prometheus::PrometheusHandle;
use ocr_dispatch::{DispatchFailure, Strategy};
use provider::Mode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use admission::AdmissionController;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub strategy: Arc<Strategy>,
    pub admission: Arc<AdmissionController>,
    pub api_secret: Option<Secret<String>>,
    /// `"redis"` or `"local"`, surfaced through /health
    pub store_backend: &'static str,
    pub prometheus: PrometheusHandle,
}

/// Form body of an /ocr request.
#[derive(Debug, Deserialize)]
pub struct OcrForm {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub mode: Option<String>,
}

/// POST /ocr
pub async fn ocr(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<OcrForm>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    handle_request(&state, &headers, form, request_id).await
}

#[instrument(skip_all, fields(request_id = %request_id))]
async fn handle_request(
    state: &AppState,
    headers: &HeaderMap,
    form: OcrForm,
    request_id: String,
) -> Response {
    let started = Instant::now();

    let provided = header_str(headers, "x-api-secret");
    if !secret_matches(&state.api_secret, provided) {
        warn!("rejected request with missing or invalid api secret");
        return finish(
            started,
            StatusCode::FORBIDDEN,
            error_body(-4, "invalid api secret", "check the X-Api-Secret header"),
        );
    }

    if form.image.trim().is_empty() {
        return finish(
            started,
            StatusCode::BAD_REQUEST,
            error_body(-5, "missing image data", "send a base64 image in the form field"),
        );
    }

    let caller_id = header_str(headers, "x-device-id").unwrap_or("").to_owned();
    let force_mode = force_mode_from(form.mode.as_deref());

    if !state.admission.check(&caller_id).await {
        info!(caller_id, "admission denied");
        crate::metrics::record_admission_denied();
        return finish(
            started,
            StatusCode::TOO_MANY_REQUESTS,
            error_body(
                -2,
                "usage limit reached",
                "daily quota exhausted, please try again tomorrow",
            ),
        );
    }

    match state.strategy.run(&form.image, force_mode).await {
        Ok(success) => {
            state.admission.record_success(&caller_id).await;
            finish(
                started,
                StatusCode::OK,
                json!({
                    "status": "success",
                    "strategy_used": success.strategy_used,
                    "result": success.result,
                }),
            )
        }
        Err(failure) => {
            let status = match failure {
                DispatchFailure::NoAccounts => StatusCode::INTERNAL_SERVER_ERROR,
                DispatchFailure::NonRetryable { .. } | DispatchFailure::Exhausted { .. } => {
                    StatusCode::BAD_GATEWAY
                }
            };
            finish(
                started,
                status,
                error_body(failure.error_code(), &failure.message(), failure.suggestion()),
            )
        }
    }
}

/// GET /health — 200 while an account pool exists, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let accounts = state.strategy.account_count();
    let (status_code, status) = if accounts > 0 {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "misconfigured")
    };

    let body = json!({
        "status": status,
        "accounts": accounts,
        "admission_store": state.store_backend,
    });
    (
        status_code,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// GET /metrics — Prometheus text exposition format.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `None` disarms the gate entirely; otherwise the header must match.
fn secret_matches(expected: &Option<Secret<String>>, provided: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(secret) => provided == Some(secret.expose().as_str()),
    }
}

/// An unknown mode string falls back to the full chain rather than
/// rejecting the request.
fn force_mode_from(raw: Option<&str>) -> Option<Mode> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<Mode>() {
        Ok(mode) => Some(mode),
        Err(e) => {
            warn!(error = %e, "unknown mode requested, running full chain");
            None
        }
    }
}

fn error_body(code: i64, message: &str, suggestion: &str) -> serde_json::Value {
    json!({
        "status": "error",
        "error_code": code,
        "error_message": message,
        "suggestion": suggestion,
    })
}

fn finish(started: Instant, status: StatusCode, body: serde_json::Value) -> Response {
    crate::metrics::record_request(status.as_u16(), started.elapsed().as_secs_f64());
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}
