//! # Bid Routes
//!
//! The counter-party's side of the negotiation: accept or reject the
//! pending bid. Both are addressed by bid identifier and fail with 409
//! when the bid is no longer pending.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use parley_state::{Bid, BidState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_path;
use crate::state::AppState;

/// A bid as returned by every bid-bearing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BidResponse {
    pub id: i64,
    pub dispute_id: i64,
    /// Offered amount in whole currency units.
    pub amount: i64,
    /// One of `pending`, `settled`, `voided`, `rejected`.
    #[schema(value_type = String)]
    pub state: BidState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Bid> for BidResponse {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id.get(),
            dispute_id: bid.dispute_id.get(),
            amount: bid.amount.get(),
            state: bid.state,
            created_at: *bid.created_at.as_datetime(),
            updated_at: *bid.updated_at.as_datetime(),
        }
    }
}

/// Build the bids router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/bids/{id}/accept", post(accept_bid))
        .route("/v1/bids/{id}/reject", post(reject_bid))
}

/// POST /v1/bids/{id}/accept: settle a pending bid and close its dispute.
#[utoipa::path(
    post,
    path = "/v1/bids/{id}/accept",
    params(("id" = i64, Path, description = "Bid ID")),
    responses(
        (status = 200, description = "Bid settled", body = BidResponse),
        (status = 404, description = "Bid not found", body = crate::error::ErrorBody),
        (status = 409, description = "Bid is not pending", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid bid ID", body = crate::error::ErrorBody),
    ),
    tag = "bids"
)]
pub async fn accept_bid(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<BidResponse>, AppError> {
    let id = extract_path(path)?;
    let bid = state.gateway.accept_bid(id).await?;
    Ok(Json(BidResponse::from(&bid)))
}

/// POST /v1/bids/{id}/reject: decline a pending bid.
#[utoipa::path(
    post,
    path = "/v1/bids/{id}/reject",
    params(("id" = i64, Path, description = "Bid ID")),
    responses(
        (status = 200, description = "Bid rejected", body = BidResponse),
        (status = 404, description = "Bid not found", body = crate::error::ErrorBody),
        (status = 409, description = "Bid is not pending", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid bid ID", body = crate::error::ErrorBody),
    ),
    tag = "bids"
)]
pub async fn reject_bid(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<BidResponse>, AppError> {
    let id = extract_path(path)?;
    let bid = state.gateway.reject_bid(id).await?;
    Ok(Json(BidResponse::from(&bid)))
}
