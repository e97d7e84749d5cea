//! # Dispute Routes
//!
//! Disputes are created empty and grow a bid history. The bidding party
//! places bids here; every response that lists bids orders them most
//! recent first, so the first element is the negotiation head.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use parley_state::{Dispute, DisputeLedger, NegotiationStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_path};
use crate::routes::bids::BidResponse;
use crate::state::AppState;

/// Request to place a bid on a dispute.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceBidRequest {
    /// Offered amount in whole currency units. Must be non-negative.
    pub amount: i64,
}

/// A newly created dispute.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Dispute> for DisputeResponse {
    fn from(dispute: &Dispute) -> Self {
        Self {
            id: dispute.id.get(),
            created_at: *dispute.created_at.as_datetime(),
        }
    }
}

/// A dispute with its full bid history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeDetailResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    /// `open` until a bid is settled, then `settled`.
    #[schema(value_type = String)]
    pub status: NegotiationStatus,
    /// Bids ordered most recent first.
    pub bids: Vec<BidResponse>,
}

impl From<&DisputeLedger> for DisputeDetailResponse {
    fn from(ledger: &DisputeLedger) -> Self {
        Self {
            id: ledger.dispute.id.get(),
            created_at: *ledger.dispute.created_at.as_datetime(),
            status: ledger.status(),
            bids: ledger.bids.iter().map(BidResponse::from).collect(),
        }
    }
}

/// The negotiation head of a dispute.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentBidResponse {
    pub dispute_id: i64,
    #[schema(value_type = String)]
    pub status: NegotiationStatus,
    /// Most recent bid, absent when no bid was placed yet.
    pub bid: Option<BidResponse>,
}

/// Build the disputes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/disputes", post(create_dispute))
        .route("/v1/disputes/{id}", get(get_dispute))
        .route("/v1/disputes/{id}/current-bid", get(current_bid))
        .route("/v1/disputes/{id}/bids", post(place_bid))
}

/// POST /v1/disputes: open a new dispute.
#[utoipa::path(
    post,
    path = "/v1/disputes",
    responses(
        (status = 201, description = "Dispute created", body = DisputeResponse),
        (status = 503, description = "Ledger store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn create_dispute(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<DisputeResponse>), AppError> {
    let dispute = state.gateway.create_dispute().await?;
    Ok((StatusCode::CREATED, Json(DisputeResponse::from(&dispute))))
}

/// GET /v1/disputes/{id}: the dispute and its bids, most recent first.
#[utoipa::path(
    get,
    path = "/v1/disputes/{id}",
    params(("id" = i64, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Dispute with bid history", body = DisputeDetailResponse),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid dispute ID", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn get_dispute(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DisputeDetailResponse>, AppError> {
    let id = extract_path(path)?;
    let ledger = state.gateway.get_dispute(id).await?;
    Ok(Json(DisputeDetailResponse::from(&ledger)))
}

/// GET /v1/disputes/{id}/current-bid: the negotiation head and status.
#[utoipa::path(
    get,
    path = "/v1/disputes/{id}/current-bid",
    params(("id" = i64, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Current negotiation head", body = CurrentBidResponse),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn current_bid(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<CurrentBidResponse>, AppError> {
    let id = extract_path(path)?;
    let head = state.gateway.current_bid(id).await?;
    Ok(Json(CurrentBidResponse {
        dispute_id: id,
        status: NegotiationStatus::from_head(head.as_ref()),
        bid: head.as_ref().map(BidResponse::from),
    }))
}

/// POST /v1/disputes/{id}/bids: place a bid, voiding the open one.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/bids",
    params(("id" = i64, Path, description = "Dispute ID")),
    request_body = PlaceBidRequest,
    responses(
        (status = 201, description = "Bid placed", body = BidResponse),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute already settled", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid amount or body", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn place_bid(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<PlaceBidRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BidResponse>), AppError> {
    let id = extract_path(path)?;
    let req = extract_json(body)?;
    let bid = state.gateway.place_bid(id, req.amount).await?;
    Ok((StatusCode::CREATED, Json(BidResponse::from(&bid))))
}
