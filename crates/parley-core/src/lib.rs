#![deny(missing_docs)]

//! # parley-core: Foundational Types for Parley
//!
//! Parley is a two-party bid negotiation service: one party places monetary
//! bids on a dispute, the other accepts or rejects them. This crate defines
//! the primitives every other crate depends on. It depends on nothing
//! internal.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** [`DisputeId`] and [`BidId`] are
//!    distinct types. A bid identifier cannot be passed where a dispute
//!    identifier is expected.
//!
//! 2. **Validated construction.** Identifiers are store-generated positive
//!    integers and [`Amount`] is a non-negative whole number of currency
//!    units. Invalid values are rejected with a [`ValidationError`] at the
//!    boundary, never deeper in the stack.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] wraps `DateTime<Utc>`.

pub mod amount;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::Amount;
pub use error::ValidationError;
pub use identity::{BidId, DisputeId};
pub use temporal::Timestamp;
