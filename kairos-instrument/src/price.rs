use crate::error::InstrumentError;
use derive_more::Display;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A fixed-precision exact-decimal price.
///
/// Values are quantized half-up to the requested precision at construction time - see
/// [`Price::new`]. Arithmetic never touches floating point; all monetary state in the kernel
/// is built from [`Decimal`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[display("{value}")]
pub struct Price {
    value: Decimal,
    precision: u8,
}

impl Price {
    /// Construct a new [`Price`], quantizing `value` half-up to `precision` decimal places.
    pub fn new(value: Decimal, precision: u8) -> Self {
        Self {
            value: value.round_dp_with_strategy(
                precision as u32,
                RoundingStrategy::MidpointAwayFromZero,
            ),
            precision,
        }
    }

    /// Construct a new [`Price`], rejecting non-positive values.
    ///
    /// The risk engine and instrument invariants require strictly positive limit/stop prices
    /// (see `spec.md` §4.6).
    pub fn new_checked(value: Decimal, precision: u8) -> Result<Self, InstrumentError> {
        let price = Self::new(value, precision);
        if price.value <= Decimal::ZERO {
            Err(InstrumentError::NonPositivePrice(price.value))
        } else {
            Ok(price)
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Assert this price's precision matches `expected`, as required wherever an instrument's
    /// `price_precision` gates a newly constructed value (`spec.md` §3).
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
}
