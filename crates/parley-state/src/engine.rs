//! # Bid Engine
//!
//! Runs the bid lifecycle against a [`LedgerStore`]. Each mutation is a
//! read-decide-write sequence:
//!
//! 1. take the dispute's serialization lock,
//! 2. re-read the negotiation head (or the addressed bid) from the store,
//! 3. decide with [`crate::lifecycle`],
//! 4. commit the plan through the store's guarded write.
//!
//! The per-dispute lock serializes racing requests inside one process. The
//! guarded commit catches races against other processes sharing the same
//! store; those surface as [`BidError::Conflict`] and are never retried
//! here. Nothing is cached between calls.

use std::sync::Arc;

use dashmap::DashMap;
use parley_core::{Amount, BidId, DisputeId, Timestamp};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::bid::{Bid, Dispute, DisputeLedger, Resolution};
use crate::error::BidError;
use crate::ledger::LedgerStore;
use crate::lifecycle;

type LockTable = Arc<DashMap<DisputeId, Arc<Mutex<()>>>>;

/// The bid lifecycle engine. Cheap to clone; clones share locks and store.
#[derive(Debug, Clone)]
pub struct BidEngine {
    store: Arc<dyn LedgerStore>,
    locks: LockTable,
}

/// Holds a dispute's serialization lock. The table entry is removed once
/// nobody else holds or awaits it.
struct DisputeGuard {
    // Field order matters: the mutex guard must drop before the lease checks
    // the reference count.
    _guard: OwnedMutexGuard<()>,
    _lease: LockLease,
}

struct LockLease {
    locks: LockTable,
    id: DisputeId,
}

impl Drop for LockLease {
    fn drop(&mut self) {
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl BidEngine {
    /// Create an engine over the given ledger store.
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// The underlying ledger store.
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    async fn lock_dispute(&self, id: DisputeId) -> DisputeGuard {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = Arc::clone(&self.locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))));
        DisputeGuard {
            _guard: lock.lock_owned().await,
            _lease: LockLease {
                locks: Arc::clone(&self.locks),
                id,
            },
        }
    }

    /// Open a new dispute.
    pub async fn create_dispute(&self) -> Result<Dispute, BidError> {
        let dispute = self.store.create_dispute(Timestamp::now()).await?;
        tracing::info!(dispute_id = dispute.id.get(), "dispute created");
        Ok(dispute)
    }

    /// A dispute and its bids, most recent first.
    pub async fn dispute(&self, id: DisputeId) -> Result<DisputeLedger, BidError> {
        self.store
            .load_dispute(id)
            .await?
            .ok_or(BidError::DisputeNotFound(id))
    }

    /// The dispute's most recent bid, or `None` when no bid was placed yet.
    pub async fn negotiation_head(&self, id: DisputeId) -> Result<Option<Bid>, BidError> {
        if self.store.find_dispute(id).await?.is_none() {
            return Err(BidError::DisputeNotFound(id));
        }
        Ok(self.store.latest_bid(id).await?)
    }

    /// Place a bid, superseding the open one if there is one.
    pub async fn place_bid(&self, dispute_id: DisputeId, amount: Amount) -> Result<Bid, BidError> {
        // Unknown disputes never reach the lock table.
        if self.store.find_dispute(dispute_id).await?.is_none() {
            return Err(BidError::DisputeNotFound(dispute_id));
        }

        let _guard = self.lock_dispute(dispute_id).await;

        if self.store.find_dispute(dispute_id).await?.is_none() {
            return Err(BidError::DisputeNotFound(dispute_id));
        }

        let head = self.store.latest_bid(dispute_id).await?;
        let placement =
            lifecycle::plan_placement(dispute_id, head.as_ref(), amount, Timestamp::now())
                .inspect_err(|e| {
                    tracing::info!(
                        dispute_id = dispute_id.get(),
                        error = %e,
                        "bid placement refused"
                    );
                })?;

        let bid = self
            .store
            .commit_placement(&placement)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    dispute_id = dispute_id.get(),
                    error = %e,
                    "bid placement commit failed"
                );
            })?;

        tracing::info!(
            dispute_id = dispute_id.get(),
            bid_id = bid.id.get(),
            amount = bid.amount.get(),
            superseded = placement.supersede.map(BidId::get),
            "bid placed"
        );
        Ok(bid)
    }

    /// Accept a pending bid, settling its dispute.
    pub async fn accept_bid(&self, bid_id: BidId) -> Result<Bid, BidError> {
        self.resolve(bid_id, Resolution::Accept).await
    }

    /// Reject a pending bid. The dispute stays open.
    pub async fn reject_bid(&self, bid_id: BidId) -> Result<Bid, BidError> {
        self.resolve(bid_id, Resolution::Reject).await
    }

    async fn resolve(&self, bid_id: BidId, resolution: Resolution) -> Result<Bid, BidError> {
        // The first read only locates the dispute to lock; the decision uses
        // the re-read taken under the lock.
        let located = self
            .store
            .find_bid(bid_id)
            .await?
            .ok_or(BidError::BidNotFound(bid_id))?;

        let _guard = self.lock_dispute(located.dispute_id).await;

        let current = self
            .store
            .find_bid(bid_id)
            .await?
            .ok_or(BidError::BidNotFound(bid_id))?;

        let transition = lifecycle::plan_resolution(&current, resolution, Timestamp::now())
            .inspect_err(|e| {
                tracing::info!(
                    bid_id = bid_id.get(),
                    %resolution,
                    error = %e,
                    "bid resolution refused"
                );
            })?;

        let bid = self.store.commit_transition(&transition).await?;
        tracing::info!(
            dispute_id = bid.dispute_id.get(),
            bid_id = bid.id.get(),
            state = %bid.state,
            "bid {}", resolution.past_tense()
        );
        Ok(bid)
    }
}
