use crate::error::InstrumentError;
use derive_more::Display;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A fixed-precision exact-decimal quantity, always non-negative.
///
/// Quantized half-up at construction like [`Price`](crate::Price); the non-negativity
/// invariant is enforced by [`Quantity::new`] returning a `Result`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[display("{value}")]
pub struct Quantity {
    value: Decimal,
    precision: u8,
}

impl Quantity {
    /// Construct a new [`Quantity`], quantizing `value` half-up to `precision` decimal places.
    ///
    /// # Errors
    /// Returns [`InstrumentError::NegativeQuantity`] if the quantized value is negative.
    pub fn new(value: Decimal, precision: u8) -> Result<Self, InstrumentError> {
        let quantized = value.round_dp_with_strategy(
            precision as u32,
            RoundingStrategy::MidpointAwayFromZero,
        );

        if quantized < Decimal::ZERO {
            return Err(InstrumentError::NegativeQuantity(quantized));
        }

        Ok(Self {
            value: quantized,
            precision,
        })
    }

    /// Construct a [`Quantity`] of zero at the given precision.
    pub fn zero(precision: u8) -> Self {
        Self {
            value: Decimal::ZERO,
            precision,
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Assert this quantity's precision matches `expected` (`spec.md` §3 / §4.6).
    pub fn check_precision(&self, expected: u8) -> Result<(), InstrumentError> {
        if self.precision == expected {
            Ok(())
        } else {
            Err(InstrumentError::PrecisionMismatch {
                expected,
                actual: self.precision,
            })
        }
    }

    /// Add two quantities at the same precision, returning a new [`Quantity`].
    pub fn checked_add(&self, other: &Self) -> Result<Self, InstrumentError> {
        Self::new(self.value + other.value, self.precision.max(other.precision))
    }

    /// Subtract `other` from `self`, returning a new [`Quantity`].
    ///
    /// # Errors
    /// Returns [`InstrumentError::NegativeQuantity`] if the result would be negative.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, InstrumentError> {
        Self::new(self.value - other.value, self.precision.max(other.precision))
    }
}
