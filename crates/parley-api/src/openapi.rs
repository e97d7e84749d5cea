//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Parley API",
        version = "0.1.0",
        description = "Two-party bid negotiation: disputes, bids, and realtime dispute sessions.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Disputes
        crate::routes::disputes::create_dispute,
        crate::routes::disputes::get_dispute,
        crate::routes::disputes::current_bid,
        crate::routes::disputes::place_bid,
        // Bids
        crate::routes::bids::accept_bid,
        crate::routes::bids::reject_bid,
        // Sessions
        crate::routes::session::join_session,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::disputes::PlaceBidRequest,
        crate::routes::disputes::DisputeResponse,
        crate::routes::disputes::DisputeDetailResponse,
        crate::routes::disputes::CurrentBidResponse,
        crate::routes::bids::BidResponse,
        crate::session::BidEvent,
        crate::session::BidEventType,
    )),
    tags(
        (name = "disputes", description = "Dispute lifecycle and bid placement"),
        (name = "bids", description = "Accept or reject the pending bid"),
        (name = "sessions", description = "Realtime dispute sessions"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
