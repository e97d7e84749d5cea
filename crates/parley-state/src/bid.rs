//! # Bid Records and Lifecycle States
//!
//! A dispute owns an ordered history of bids. Each bid moves through a
//! small state machine:
//!
//! ```text
//!            accept()
//!   Pending ──────────▶ Settled   (closes the negotiation)
//!      │
//!      ├── reject() ──▶ Rejected
//!      │
//!      └── superseded ─▶ Voided   (a newer bid was placed)
//! ```
//!
//! All three targets are terminal for the bid. Only `Settled` is also
//! terminal for the dispute.
//!
//! ## Design Choice: Validated Enum over Typestate
//!
//! Bids are read back from a relational store where the state is not known
//! at compile time, and every decision re-reads that state. A runtime
//! validated enum serializes straight into the `bids.state` column.

use std::str::FromStr;

use parley_core::{Amount, BidId, DisputeId, Timestamp};
use serde::{Deserialize, Serialize};

/// The lifecycle state of a single bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidState {
    /// Open offer awaiting the counter-party. At most one per dispute.
    Pending,
    /// Accepted by the counter-party. Terminal for the bid and the dispute.
    Settled,
    /// Superseded by a newer bid. Terminal for the bid.
    Voided,
    /// Declined by the counter-party. Terminal for the bid.
    Rejected,
}

impl BidState {
    /// The canonical string stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled => "settled",
            Self::Voided => "voided",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the bid can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a bid in this state ends the dispute's negotiation.
    pub fn closes_negotiation(&self) -> bool {
        matches!(self, Self::Settled)
    }

    /// Valid target states from this state.
    pub fn valid_transitions(&self) -> &'static [BidState] {
        match self {
            Self::Pending => &[Self::Settled, Self::Rejected, Self::Voided],
            Self::Settled | Self::Voided | Self::Rejected => &[],
        }
    }

    /// Whether `self → to` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, to: BidState) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for BidState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`BidState`] from its stored string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bid state: \"{0}\"")]
pub struct UnknownBidState(pub String);

impl FromStr for BidState {
    type Err = UnknownBidState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "settled" => Ok(Self::Settled),
            "voided" => Ok(Self::Voided),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownBidState(other.to_string())),
        }
    }
}

/// The counter-party's answer to a pending bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Accept the bid, settling the dispute.
    Accept,
    /// Reject the bid. The dispute stays open for further bids.
    Reject,
}

impl Resolution {
    /// The state a pending bid moves to under this resolution.
    pub fn target_state(&self) -> BidState {
        match self {
            Self::Accept => BidState::Settled,
            Self::Reject => BidState::Rejected,
        }
    }

    /// Past participle used in user-facing messages ("accepted", "rejected").
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Accept => "accepted",
            Self::Reject => "rejected",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => f.write_str("accept"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// A dispute: the join target of bids. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Store-generated identifier.
    pub id: DisputeId,
    /// When the dispute was opened.
    pub created_at: Timestamp,
}

/// One offer within a dispute's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Store-generated identifier. Higher means more recent.
    pub id: BidId,
    /// Owning dispute.
    pub dispute_id: DisputeId,
    /// Offered amount in whole currency units.
    pub amount: Amount,
    /// Current lifecycle state.
    pub state: BidState,
    /// When the bid was placed.
    pub created_at: Timestamp,
    /// When the state last changed.
    pub updated_at: Timestamp,
}

/// Whether a dispute still accepts bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationStatus {
    /// No bid has been settled; new bids may be placed.
    Open,
    /// The head bid is settled; the negotiation is closed.
    Settled,
}

impl NegotiationStatus {
    /// Derive the status from the dispute's most recent bid.
    pub fn from_head(head: Option<&Bid>) -> Self {
        match head {
            Some(bid) if bid.state.closes_negotiation() => Self::Settled,
            _ => Self::Open,
        }
    }
}

/// A dispute together with its full bid history, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeLedger {
    /// The dispute row.
    pub dispute: Dispute,
    /// Bids ordered by identifier descending.
    pub bids: Vec<Bid>,
}

impl DisputeLedger {
    /// The negotiation head: the most recently created bid, if any.
    pub fn head(&self) -> Option<&Bid> {
        self.bids.first()
    }

    /// Negotiation status derived from the head bid.
    pub fn status(&self) -> NegotiationStatus {
        NegotiationStatus::from_head(self.head())
    }

    /// Number of bids currently in `Pending`.
    pub fn pending_count(&self) -> usize {
        self.bids
            .iter()
            .filter(|b| b.state == BidState::Pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(id: i64, state: BidState) -> Bid {
        let now = Timestamp::now();
        Bid {
            id: BidId::new(id).unwrap(),
            dispute_id: DisputeId::new(1).unwrap(),
            amount: Amount::new(100).unwrap(),
            state,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_pending_has_outgoing_edges() {
        assert_eq!(BidState::Pending.valid_transitions().len(), 3);
        for s in [BidState::Settled, BidState::Voided, BidState::Rejected] {
            assert!(s.valid_transitions().is_empty(), "{s} should be terminal");
            assert!(s.is_terminal());
        }
        assert!(!BidState::Pending.is_terminal());
    }

    #[test]
    fn only_settled_closes_negotiation() {
        assert!(BidState::Settled.closes_negotiation());
        assert!(!BidState::Rejected.closes_negotiation());
        assert!(!BidState::Voided.closes_negotiation());
        assert!(!BidState::Pending.closes_negotiation());
    }

    #[test]
    fn can_transition_to_matches_graph() {
        assert!(BidState::Pending.can_transition_to(BidState::Settled));
        assert!(BidState::Pending.can_transition_to(BidState::Voided));
        assert!(!BidState::Pending.can_transition_to(BidState::Pending));
        assert!(!BidState::Rejected.can_transition_to(BidState::Settled));
    }

    #[test]
    fn state_strings_roundtrip_through_from_str() {
        for s in [
            BidState::Pending,
            BidState::Settled,
            BidState::Voided,
            BidState::Rejected,
        ] {
            assert_eq!(s.as_str().parse::<BidState>().unwrap(), s);
        }
        assert_eq!(
            "withdrawn".parse::<BidState>().unwrap_err(),
            UnknownBidState("withdrawn".to_string())
        );
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BidState::Rejected).unwrap(),
            "\"rejected\""
        );
    }

    #[test]
    fn resolution_targets() {
        assert_eq!(Resolution::Accept.target_state(), BidState::Settled);
        assert_eq!(Resolution::Reject.target_state(), BidState::Rejected);
        assert_eq!(Resolution::Accept.past_tense(), "accepted");
    }

    #[test]
    fn ledger_head_and_status() {
        let dispute = Dispute {
            id: DisputeId::new(1).unwrap(),
            created_at: Timestamp::now(),
        };
        let empty = DisputeLedger {
            dispute,
            bids: vec![],
        };
        assert!(empty.head().is_none());
        assert_eq!(empty.status(), NegotiationStatus::Open);

        let settled = DisputeLedger {
            dispute,
            bids: vec![bid(2, BidState::Settled), bid(1, BidState::Voided)],
        };
        assert_eq!(settled.head().unwrap().id.get(), 2);
        assert_eq!(settled.status(), NegotiationStatus::Settled);
        assert_eq!(settled.pending_count(), 0);
    }
}
