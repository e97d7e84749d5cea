#![deny(missing_docs)]

//! # parley-state: Bid Lifecycle
//!
//! Implements the negotiation protocol between two parties on a dispute:
//! one side places monetary bids, the other accepts or rejects the open
//! one. Placing a new bid supersedes (voids) the open bid, and accepting a
//! bid settles the dispute for good.
//!
//! ## Modules
//!
//! - [`bid`]: bid records, [`BidState`] and the lifecycle graph.
//! - [`lifecycle`]: pure decision functions producing commit plans.
//! - [`ledger`]: the [`LedgerStore`] contract the engine persists through.
//! - [`memory`]: an in-process [`LedgerStore`].
//! - [`engine`]: [`BidEngine`], which serializes mutations per dispute.
//!
//! ## Invariants
//!
//! - At most one `Pending` bid exists per dispute at any time.
//! - Once a bid is `Settled`, no further bids are accepted on its dispute.
//! - Only `Pending` bids change state, and only along the lifecycle graph.

pub mod bid;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod memory;

pub use bid::{Bid, BidState, Dispute, DisputeLedger, NegotiationStatus, Resolution};
pub use engine::BidEngine;
pub use error::BidError;
pub use ledger::{LedgerStore, StoreError};
pub use memory::MemoryLedger;
