//! # Validation Errors
//!
//! Errors raised when a raw value cannot become a domain primitive. Each
//! variant carries the rejected input so callers can report it verbatim.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifiers are generated by the ledger store and start at 1.
    #[error("invalid {kind} identifier: {value} (expected a positive integer)")]
    InvalidIdentifier {
        /// Which identifier namespace was being parsed ("dispute", "bid").
        kind: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// Bid amounts are whole, non-negative currency units.
    #[error("invalid bid amount: {0} (expected a non-negative integer)")]
    NegativeAmount(i64),
}
