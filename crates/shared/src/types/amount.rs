//! Strictly positive monetary amount.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected amount values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amount was zero.
    #[error("Amount cannot be zero")]
    Zero,

    /// Amount was negative.
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),
}

/// A monetary amount that is guaranteed to be greater than zero.
///
/// Every deposit, withdrawal and transfer moves an `Amount`; balances
/// themselves are plain `Decimal` since they may be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Creates an amount, rejecting zero and negative values.
    ///
    /// # Errors
    ///
    /// Returns `AmountError` if `value <= 0`.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_zero() {
            return Err(AmountError::Zero);
        }
        if value.is_sign_negative() {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "amount_tests.rs"]
mod tests;
