//! Prometheus Metrics
//!
//! Process-wide recorder rendered at `GET /metrics`:
//! - HTTP request counts and latency per route
//! - Cache hits and misses as seen by the orchestrator
//! - Request log writes and failures

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, error, info, warn};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    pub const CACHE_HITS_TOTAL: &str = "math_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "math_cache_misses_total";
    pub const RECORDS_TOTAL: &str = "math_request_logs_total";
    pub const PERSISTENCE_FAILURES_TOTAL: &str = "math_persistence_failures_total";
}

/// Installs the Prometheus recorder.
///
/// Returns `true` if this call installed it, `false` if it was already
/// installed or installation failed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        debug!("Prometheus metrics already initialized");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                warn!("Prometheus handle already set");
                return false;
            }
            info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Renders every metric in the Prometheus text format.
///
/// Returns `None` if [`init_metrics`] has not run.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// == HTTP ==

/// Records one HTTP request against its route template.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Middleware timing every request.
///
/// Labels by the matched route template so query strings never become
/// label values; unmatched requests share one label.
pub async fn track_http(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    record_http_request(&method, &path, response.status().as_u16(), started.elapsed());

    response
}

// == Orchestrator ==

pub fn record_cache_hit(endpoint: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "endpoint" => endpoint).increment(1);
}

pub fn record_cache_miss(endpoint: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "endpoint" => endpoint).increment(1);
}

pub fn record_persisted(endpoint: &'static str) {
    counter!(names::RECORDS_TOTAL, "endpoint" => endpoint).increment(1);
}

pub fn record_persistence_failure(endpoint: &'static str) {
    counter!(names::PERSISTENCE_FAILURES_TOTAL, "endpoint" => endpoint).increment(1);
}
