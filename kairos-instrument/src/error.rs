use thiserror::Error;

/// Errors raised by the value types and instrument model in this crate.
///
/// These map onto the `InvariantViolation` error kind of the overall kernel (see the
/// workspace `SPEC_FULL.md` §7): callers at the kernel boundary treat all of them as fatal.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum InstrumentError {
    #[error("quantity must be non-negative, got {0}")]
    NegativeQuantity(rust_decimal::Decimal),

    #[error("currency mismatch: {lhs} vs {rhs}")]
    CurrencyMismatch { lhs: String, rhs: String },

    #[error("value has precision {actual}, expected {expected}")]
    PrecisionMismatch { expected: u8, actual: u8 },

    #[error("price must be positive, got {0}")]
    NonPositivePrice(rust_decimal::Decimal),
}
