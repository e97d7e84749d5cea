//! # Identifier Newtypes
//!
//! Disputes and bids are identified by integers generated by the ledger
//! store on insert. Bid identifiers are monotonic within the store, so
//! ordering bids by identifier is ordering them by creation.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of a dispute (a negotiation session between two parties).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisputeId(i64);

/// Identifier of a single bid within a dispute's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(i64);

impl DisputeId {
    /// Validate a raw identifier received from a client or a store row.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value < 1 {
            return Err(ValidationError::InvalidIdentifier {
                kind: "dispute",
                value,
            });
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub fn get(self) -> i64 {
        self.0
    }

    /// Name of the realtime session channel scoped to this dispute.
    pub fn session_channel(self) -> String {
        format!("dispute-{}", self.0)
    }
}

impl BidId {
    /// Validate a raw identifier received from a client or a store row.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value < 1 {
            return Err(ValidationError::InvalidIdentifier { kind: "bid", value });
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for DisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispute:{}", self.0)
    }
}

impl std::fmt::Display for BidId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bid:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispute_id_rejects_non_positive() {
        assert!(DisputeId::new(0).is_err());
        assert!(DisputeId::new(-1).is_err());
        assert_eq!(DisputeId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn bid_id_rejects_non_positive() {
        let err = BidId::new(0).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidIdentifier {
                kind: "bid",
                value: 0
            }
        );
    }

    #[test]
    fn display_is_namespaced() {
        assert_eq!(DisputeId::new(3).unwrap().to_string(), "dispute:3");
        assert_eq!(BidId::new(12).unwrap().to_string(), "bid:12");
    }

    #[test]
    fn session_channel_name() {
        assert_eq!(DisputeId::new(42).unwrap().session_channel(), "dispute-42");
    }

    #[test]
    fn serializes_as_bare_integer() {
        let id = BidId::new(5).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "5");
        let back: BidId = serde_json::from_str("5").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn bid_ids_order_by_creation() {
        let earlier = BidId::new(1).unwrap();
        let later = BidId::new(2).unwrap();
        assert!(earlier < later);
    }
}
