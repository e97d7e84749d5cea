//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`BidError`] and validation failures to HTTP status codes and a
//! JSON body of the form `{"error":{"code":"...","message":"..."}}`.
//! Internal error details are logged, never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_state::BidError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BID_NOT_PENDING").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Dispute or bid not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Identifier or amount failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or path could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The dispute's negotiation is closed (409).
    #[error("{0}")]
    DisputeSettled(String),

    /// Accept/reject on a bid that is no longer pending (409).
    #[error("{0}")]
    BidNotPending(String),

    /// A concurrent request changed the dispute first (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The ledger store could not be reached (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::DisputeSettled(_) => (StatusCode::CONFLICT, "DISPUTE_SETTLED"),
            Self::BidNotPending(_) => (StatusCode::CONFLICT, "BID_NOT_PENDING"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            Self::Conflict(_) => tracing::info!(error = %self, "request lost a race"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<parley_core::ValidationError> for AppError {
    fn from(err: parley_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Convert bid lifecycle errors to API errors.
impl From<BidError> for AppError {
    fn from(err: BidError) -> Self {
        match err {
            BidError::DisputeNotFound(_) | BidError::BidNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            BidError::DisputeAlreadySettled(_) => Self::DisputeSettled(err.to_string()),
            BidError::BidNotPending { .. } => Self::BidNotPending(err.to_string()),
            BidError::Validation(inner) => Self::from(inner),
            BidError::Conflict(msg) => Self::Conflict(msg),
            BidError::StoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "ledger store round trip failed");
                Self::ServiceUnavailable("ledger store unavailable".to_string())
            }
            BidError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use parley_core::{BidId, DisputeId, ValidationError};
    use parley_state::{BidState, Resolution};

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn not_found_status_code() {
        let err = AppError::from(BidError::BidNotFound(BidId::new(3).unwrap()));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(err.to_string(), "bid:3 not found");
    }

    #[test]
    fn validation_status_code() {
        let err = AppError::from(BidError::Validation(ValidationError::NegativeAmount(-1)));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "VALIDATION_ERROR");
    }

    #[test]
    fn bad_request_status_code() {
        let err = AppError::BadRequest("malformed JSON".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[test]
    fn lifecycle_rejections_are_conflicts() {
        let settled = AppError::from(BidError::DisputeAlreadySettled(DisputeId::new(1).unwrap()));
        assert_eq!(
            settled.status_and_code(),
            (StatusCode::CONFLICT, "DISPUTE_SETTLED")
        );

        let not_pending = AppError::from(BidError::BidNotPending {
            bid_id: BidId::new(2).unwrap(),
            state: BidState::Voided,
            resolution: Resolution::Accept,
        });
        assert_eq!(
            not_pending.status_and_code(),
            (StatusCode::CONFLICT, "BID_NOT_PENDING")
        );

        let raced = AppError::from(BidError::Conflict("head moved".into()));
        assert_eq!(raced.status_and_code(), (StatusCode::CONFLICT, "CONFLICT"));
    }

    #[test]
    fn store_unavailable_is_503() {
        let err = AppError::from(BidError::StoreUnavailable("pool timed out".into()));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "SERVICE_UNAVAILABLE");
        assert!(!err.to_string().contains("pool timed out"));
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let (status, body) =
            body_json(AppError::from(BidError::Internal("bad state column".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn body_carries_human_readable_message() {
        let (status, body) = body_json(AppError::from(BidError::BidNotPending {
            bid_id: BidId::new(9).unwrap(),
            state: BidState::Rejected,
            resolution: Resolution::Reject,
        }))
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "BID_NOT_PENDING");
        assert_eq!(
            body["error"]["message"],
            "bid:9 cannot be rejected because it is rejected, not pending"
        );
    }
}
