//! # In-Memory Ledger
//!
//! [`LedgerStore`] backed by process memory. Used when no database is
//! configured (development) and throughout the test suites.
//!
//! All operations take a `parking_lot` lock and never hold it across an
//! `.await`. Guarded commits run their checks and writes under a single
//! write lock, so a commit is atomic with respect to every other reader
//! and writer. `parking_lot::RwLock` does not poison: a panicking writer
//! cannot leave the ledger permanently locked.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use parley_core::{BidId, DisputeId, Timestamp};

use crate::bid::{Bid, BidState, Dispute, DisputeLedger};
use crate::ledger::{LedgerStore, StoreError};
use crate::lifecycle::{Placement, Transition};

#[derive(Debug, Default)]
struct Tables {
    last_dispute_id: i64,
    last_bid_id: i64,
    disputes: BTreeMap<DisputeId, Dispute>,
    bids: BTreeMap<BidId, Bid>,
    /// Bid identifiers per dispute in insertion (ascending) order.
    by_dispute: HashMap<DisputeId, Vec<BidId>>,
}

impl Tables {
    fn head_id(&self, dispute_id: DisputeId) -> Option<BidId> {
        self.by_dispute
            .get(&dispute_id)
            .and_then(|ids| ids.last().copied())
    }

    fn next_dispute_id(&mut self) -> Result<DisputeId, StoreError> {
        self.last_dispute_id += 1;
        DisputeId::new(self.last_dispute_id).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn next_bid_id(&mut self) -> Result<BidId, StoreError> {
        self.last_bid_id += 1;
        BidId::new(self.last_bid_id).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

/// Thread-safe, cloneable in-memory ledger. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryLedger {
    /// Create an empty ledger. Identifiers start at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of disputes recorded.
    pub fn dispute_count(&self) -> usize {
        self.tables.read().disputes.len()
    }

    /// Number of bids recorded across all disputes.
    pub fn bid_count(&self) -> usize {
        self.tables.read().bids.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_dispute(&self, created_at: Timestamp) -> Result<Dispute, StoreError> {
        let mut tables = self.tables.write();
        let id = tables.next_dispute_id()?;
        let dispute = Dispute { id, created_at };
        tables.disputes.insert(id, dispute);
        tables.by_dispute.insert(id, Vec::new());
        Ok(dispute)
    }

    async fn find_dispute(&self, id: DisputeId) -> Result<Option<Dispute>, StoreError> {
        Ok(self.tables.read().disputes.get(&id).copied())
    }

    async fn load_dispute(&self, id: DisputeId) -> Result<Option<DisputeLedger>, StoreError> {
        let tables = self.tables.read();
        let Some(dispute) = tables.disputes.get(&id).copied() else {
            return Ok(None);
        };
        let bids = tables
            .by_dispute
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .filter_map(|bid_id| tables.bids.get(bid_id).copied())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(DisputeLedger { dispute, bids }))
    }

    async fn latest_bid(&self, dispute_id: DisputeId) -> Result<Option<Bid>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .head_id(dispute_id)
            .and_then(|id| tables.bids.get(&id).copied()))
    }

    async fn find_bid(&self, id: BidId) -> Result<Option<Bid>, StoreError> {
        Ok(self.tables.read().bids.get(&id).copied())
    }

    async fn commit_placement(&self, placement: &Placement) -> Result<Bid, StoreError> {
        let mut tables = self.tables.write();

        if !tables.disputes.contains_key(&placement.dispute_id) {
            return Err(StoreError::Conflict(format!(
                "{} disappeared before the bid was committed",
                placement.dispute_id
            )));
        }

        let head = tables.head_id(placement.dispute_id);
        if head != placement.expected_head {
            return Err(StoreError::Conflict(format!(
                "negotiation head of {} moved from {:?} to {:?}",
                placement.dispute_id,
                placement.expected_head.map(BidId::get),
                head.map(BidId::get)
            )));
        }

        // Validate the supersede target before writing anything.
        if let Some(prior_id) = placement.supersede {
            match tables.bids.get(&prior_id) {
                Some(prior) if prior.state == BidState::Pending => {}
                Some(prior) => {
                    return Err(StoreError::Conflict(format!(
                        "{prior_id} is {} and can no longer be superseded",
                        prior.state
                    )));
                }
                None => {
                    return Err(StoreError::Conflict(format!("{prior_id} not in ledger")));
                }
            }
        }

        let id = tables.next_bid_id()?;
        if let Some(prior_id) = placement.supersede {
            if let Some(prior) = tables.bids.get_mut(&prior_id) {
                prior.state = BidState::Voided;
                prior.updated_at = placement.at;
            }
        }

        let bid = Bid {
            id,
            dispute_id: placement.dispute_id,
            amount: placement.amount,
            state: BidState::Pending,
            created_at: placement.at,
            updated_at: placement.at,
        };
        tables.bids.insert(id, bid);
        tables
            .by_dispute
            .entry(placement.dispute_id)
            .or_default()
            .push(id);

        Ok(bid)
    }

    async fn commit_transition(&self, transition: &Transition) -> Result<Bid, StoreError> {
        let mut tables = self.tables.write();
        let bid = tables
            .bids
            .get_mut(&transition.bid_id)
            .ok_or_else(|| StoreError::Conflict(format!("{} not in ledger", transition.bid_id)))?;

        if bid.state != transition.from {
            return Err(StoreError::Conflict(format!(
                "{} is {}, expected {}",
                transition.bid_id, bid.state, transition.from
            )));
        }

        bid.state = transition.to;
        bid.updated_at = transition.at;
        Ok(*bid)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        // Acquiring the read lock proves the ledger is not wedged.
        let _ = self.tables.read().disputes.len();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
