//! # Request Tracing
//!
//! `tower_http::trace::TraceLayer` configured for Parley. Spans carry the
//! route template rather than the raw URI so dispute and bid identifiers do
//! not explode span cardinality; the concrete URI is kept as a separate
//! field for correlation.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

/// The trace layer type mounted on the Parley router.
pub type ParleyTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> Span,
    DefaultOnRequest,
    DefaultOnResponse,
>;

/// Build the trace layer. 5xx responses are recorded as failures.
pub fn layer() -> ParleyTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(request_span as fn(&Request<Body>) -> Span)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

fn request_span(request: &Request<Body>) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("unmatched");

    tracing::info_span!(
        "parley.request",
        method = %request.method(),
        route,
        uri = %request.uri(),
    )
}

