//! # Bid Amounts
//!
//! Amounts are whole currency units with no minor-unit component. Floats
//! never appear in a bid record.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A non-negative, whole-unit monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Validate a raw amount. Zero is a legal (if unusual) bid.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value < 0 {
            return Err(ValidationError::NegativeAmount(value));
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_allowed() {
        assert_eq!(Amount::new(0).unwrap().get(), 0);
    }

    #[test]
    fn negative_is_rejected() {
        assert_eq!(
            Amount::new(-1).unwrap_err(),
            ValidationError::NegativeAmount(-1)
        );
    }

    proptest! {
        #[test]
        fn accepts_exactly_the_non_negative_range(value in any::<i64>()) {
            prop_assert_eq!(Amount::new(value).is_ok(), value >= 0);
        }
    }
}
