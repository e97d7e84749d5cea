//! # Bid Lifecycle Decisions
//!
//! Pure decision logic: given the current ledger state and an incoming
//! action, compute the mutation to commit or reject the action. Nothing
//! here performs I/O or holds state between calls. [`crate::engine`] reads
//! the ledger, calls into this module, and hands the resulting plan to the
//! store.
//!
//! The negotiation head is the most recently created bid of a dispute.
//! Every plan records the head it was decided against so the store can
//! refuse to commit if the ledger moved underneath it.

use parley_core::{Amount, BidId, DisputeId, Timestamp};

use crate::bid::{Bid, BidState, Resolution};
use crate::error::BidError;

/// A decided PlaceBid: optionally void the open bid, then insert a new one.
///
/// Both halves form one unit of work; a store commits both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Dispute receiving the bid.
    pub dispute_id: DisputeId,
    /// Head bid observed when the decision was made.
    pub expected_head: Option<BidId>,
    /// Pending bid to move to `Voided`, if the head was open.
    pub supersede: Option<BidId>,
    /// Amount of the new bid.
    pub amount: Amount,
    /// Creation and update time for the new bid and the superseded one.
    pub at: Timestamp,
}

/// A decided single-bid state change, guarded by the expected prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Bid to update.
    pub bid_id: BidId,
    /// Dispute owning the bid.
    pub dispute_id: DisputeId,
    /// State the bid must still be in for the update to apply.
    pub from: BidState,
    /// State to move to.
    pub to: BidState,
    /// New `updated_at`.
    pub at: Timestamp,
}

/// Decide a PlaceBid against the dispute's current head.
///
/// - settled head: the negotiation is closed, fail with
///   [`BidError::DisputeAlreadySettled`].
/// - pending head: the new bid supersedes it.
/// - rejected/voided head or no bids: plain insert.
pub fn plan_placement(
    dispute_id: DisputeId,
    head: Option<&Bid>,
    amount: Amount,
    at: Timestamp,
) -> Result<Placement, BidError> {
    let supersede = match head {
        Some(bid) if bid.state.closes_negotiation() => {
            return Err(BidError::DisputeAlreadySettled(dispute_id));
        }
        Some(bid) if bid.state == BidState::Pending => Some(bid.id),
        _ => None,
    };

    Ok(Placement {
        dispute_id,
        expected_head: head.map(|b| b.id),
        supersede,
        amount,
        at,
    })
}

/// Decide an AcceptBid or RejectBid on `bid`.
pub fn plan_resolution(
    bid: &Bid,
    resolution: Resolution,
    at: Timestamp,
) -> Result<Transition, BidError> {
    let to = resolution.target_state();
    if !bid.state.can_transition_to(to) {
        return Err(BidError::BidNotPending {
            bid_id: bid.id,
            state: bid.state,
            resolution,
        });
    }

    Ok(Transition {
        bid_id: bid.id,
        dispute_id: bid.dispute_id,
        from: bid.state,
        to,
        at,
    })
}
