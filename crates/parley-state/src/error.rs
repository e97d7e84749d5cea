//! # Bid Lifecycle Errors
//!
//! Every rejection the engine can produce. State machine rejections carry
//! the bid, its current state, and the attempted action so the gateway can
//! report them without re-reading the ledger.

use parley_core::{BidId, DisputeId, ValidationError};
use thiserror::Error;

use crate::bid::{BidState, Resolution};
use crate::ledger::StoreError;

/// Errors arising from bid lifecycle operations.
#[derive(Error, Debug)]
pub enum BidError {
    /// The referenced dispute does not exist.
    #[error("{0} not found")]
    DisputeNotFound(DisputeId),

    /// A bid in the dispute was settled; no further bids may be placed.
    #[error("the bid cannot be placed because {0} is already settled")]
    DisputeAlreadySettled(DisputeId),

    /// The referenced bid does not exist.
    #[error("{0} not found")]
    BidNotFound(BidId),

    /// Accept/reject attempted on a bid that is no longer open.
    #[error("{bid_id} cannot be {} because it is {state}, not pending", .resolution.past_tense())]
    BidNotPending {
        /// The bid that was addressed.
        bid_id: BidId,
        /// Its state at decision time.
        state: BidState,
        /// What the caller tried to do.
        resolution: Resolution,
    },

    /// Malformed identifier or amount.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A guarded commit observed a ledger that changed after the decision.
    #[error("conflicting update: {0}")]
    Conflict(String),

    /// The ledger store could not complete a round trip.
    #[error("ledger store unavailable: {0}")]
    StoreUnavailable(String),

    /// The ledger returned data that violates its own schema.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for BidError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Corrupt(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_message_mentions_dispute() {
        let err = BidError::DisputeAlreadySettled(DisputeId::new(4).unwrap());
        let msg = err.to_string();
        assert!(msg.contains("already settled"), "got: {msg}");
        assert!(msg.contains("dispute:4"), "got: {msg}");
    }

    #[test]
    fn not_pending_message_names_action_and_state() {
        let err = BidError::BidNotPending {
            bid_id: BidId::new(9).unwrap(),
            state: BidState::Rejected,
            resolution: Resolution::Reject,
        };
        assert_eq!(
            err.to_string(),
            "bid:9 cannot be rejected because it is rejected, not pending"
        );
    }

    #[test]
    fn store_errors_map_to_engine_kinds() {
        assert!(matches!(
            BidError::from(StoreError::Unavailable("down".into())),
            BidError::StoreUnavailable(_)
        ));
        assert!(matches!(
            BidError::from(StoreError::Conflict("raced".into())),
            BidError::Conflict(_)
        ));
        assert!(matches!(
            BidError::from(StoreError::Corrupt("bad row".into())),
            BidError::Internal(_)
        ));
    }

    #[test]
    fn validation_error_converts() {
        let err: BidError = ValidationError::NegativeAmount(-5).into();
        assert!(matches!(err, BidError::Validation(_)));
    }
}
