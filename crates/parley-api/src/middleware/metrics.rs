//! # Prometheus Metrics
//!
//! HTTP-level metrics recorded through the `metrics` facade. The binary
//! installs a `metrics-exporter-prometheus` recorder and `/metrics` renders
//! it; without an installed recorder every call here is a no-op, which is
//! what the test suites rely on.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `parley_http_requests_total` | counter | method, path, status |
//! | `parley_http_errors_total` | counter | method, path, status |
//! | `parley_http_request_duration_seconds` | histogram | method, path |
//! | `parley_bids_total` | counter | transition (recorded by the gateway) |

use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder.
///
/// Fails if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Middleware that records request count, latency, and 4xx/5xx errors.
///
/// Paths are labelled by route template (`/v1/disputes/{id}`) to keep the
/// label set bounded.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    record_request(&method, &path, response.status(), start.elapsed());
    response
}

/// Record one completed request.
pub fn record_request(method: &str, path: &str, status: StatusCode, elapsed: Duration) {
    metrics::counter!(
        "parley_http_requests_total",
        "method" => method.to_owned(),
        "path" => path.to_owned(),
        "status" => status.as_str().to_owned()
    )
    .increment(1);

    metrics::histogram!(
        "parley_http_request_duration_seconds",
        "method" => method.to_owned(),
        "path" => path.to_owned()
    )
    .record(elapsed.as_secs_f64());

    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(
            "parley_http_errors_total",
            "method" => method.to_owned(),
            "path" => path.to_owned(),
            "status" => status.as_str().to_owned()
        )
        .increment(1);
    }
}
