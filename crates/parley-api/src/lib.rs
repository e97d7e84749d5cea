//! # parley-api: Axum API Services for Parley
//!
//! HTTP surface of the two-party bid negotiation service. One party places
//! bids on a dispute, the other accepts or rejects the open bid, and both
//! follow the negotiation live through the dispute's session.
//!
//! ## API Surface
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/v1/disputes` | CreateDispute |
//! | GET | `/v1/disputes/{id}` | GetDispute |
//! | GET | `/v1/disputes/{id}/current-bid` | negotiation head |
//! | POST | `/v1/disputes/{id}/bids` | PlaceBid |
//! | POST | `/v1/bids/{id}/accept` | AcceptBid |
//! | POST | `/v1/bids/{id}/reject` | RejectBid |
//! | GET | `/v1/disputes/{id}/session` | realtime session (WebSocket) |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod db;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let mut api = Router::new()
        .merge(routes::disputes::router())
        .merge(routes::bids::router())
        .merge(routes::session::router())
        .merge(openapi::router())
        // Bid requests are tiny; cap bodies at 64 KiB.
        .layer(DefaultBodyLimit::max(64 * 1024));

    if state.config.metrics_enabled {
        api = api.route_layer(from_fn(middleware::metrics::metrics_middleware));
    }

    let api = api
        .layer(middleware::tracing_layer::layer())
        .with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if state.config.metrics_enabled {
        probes = probes.route("/metrics", get(prometheus_metrics));
    }

    Router::new().merge(probes.with_state(state)).merge(api)
}

/// GET /metrics: Prometheus text exposition.
///
/// 503 when no recorder was installed (tests and embedded use).
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Liveness probe: always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready" when the ledger store answers a round trip,
/// 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.gateway.engine().store();
    if let Err(e) = store.ping().await {
        tracing::warn!(backend = store.backend_name(), error = %e, "ledger health check failed");
        return (StatusCode::SERVICE_UNAVAILABLE, "ledger store unreachable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
