//! # Ledger Store Contract
//!
//! The bid ledger is owned by an external relational store. The engine only
//! requires the operations below. Implementations must be `Send + Sync` so
//! they can be shared across request tasks behind an `Arc`, and the trait is
//! object-safe so the backend (in-memory or Postgres) is chosen at startup.
//!
//! ## Guarded Commits
//!
//! [`LedgerStore::commit_placement`] and [`LedgerStore::commit_transition`]
//! re-validate the preconditions their plan was decided under, inside the
//! same unit of work that writes. A plan decided against a stale head fails
//! with [`StoreError::Conflict`] and leaves the ledger untouched.

use async_trait::async_trait;
use parley_core::{BidId, DisputeId, Timestamp};
use thiserror::Error;

use crate::bid::{Bid, Dispute, DisputeLedger};
use crate::lifecycle::{Placement, Transition};

/// Errors reported by a ledger store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The round trip to the store failed (connection, timeout, I/O).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A guarded write found the ledger in a different state than planned.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back into a domain record.
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),
}

/// Persistence operations the bid engine requires.
#[async_trait]
pub trait LedgerStore: Send + Sync + std::fmt::Debug {
    /// Insert a dispute with a store-generated identifier.
    async fn create_dispute(&self, created_at: Timestamp) -> Result<Dispute, StoreError>;

    /// Point lookup of a dispute row.
    async fn find_dispute(&self, id: DisputeId) -> Result<Option<Dispute>, StoreError>;

    /// A dispute with all of its bids, ordered by identifier descending.
    async fn load_dispute(&self, id: DisputeId) -> Result<Option<DisputeLedger>, StoreError>;

    /// The most recently created bid of a dispute.
    async fn latest_bid(&self, dispute_id: DisputeId) -> Result<Option<Bid>, StoreError>;

    /// Point lookup of a bid.
    async fn find_bid(&self, id: BidId) -> Result<Option<Bid>, StoreError>;

    /// Atomically supersede (if planned) and insert the new pending bid.
    ///
    /// Fails with [`StoreError::Conflict`] when the dispute's head is no
    /// longer `expected_head` or the superseded bid is no longer pending.
    async fn commit_placement(&self, placement: &Placement) -> Result<Bid, StoreError>;

    /// Conditionally update a bid's state, returning the updated record.
    ///
    /// Fails with [`StoreError::Conflict`] when the bid is no longer in
    /// `transition.from`.
    async fn commit_transition(&self, transition: &Transition) -> Result<Bid, StoreError>;

    /// Cheap round trip used by readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Human-readable backend name for logs.
    fn backend_name(&self) -> &'static str;
}
