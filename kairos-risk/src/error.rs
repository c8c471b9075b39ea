use kairos_instrument::InstrumentId;
use thiserror::Error;

/// The reason an order was denied by the risk gate (`spec.md` §4.6).
///
/// Carried verbatim into the `OrderDenied` event the strategy receives via its
/// `on_order_denied` callback - denial is the kernel's one soft-fail channel, everything else
/// is an [`ExecutionError::InvariantViolation`](kairos_execution::ExecutionError).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskDenyReason {
    #[error("trading state is HALTED")]
    Halted,

    #[error("trading state is REDUCING and this order would increase net position")]
    Reducing,

    #[error("instrument {0} not found")]
    UnknownInstrument(InstrumentId),

    #[error("quantity precision {actual} does not match instrument precision {expected}")]
    QuantityPrecision { expected: u8, actual: u8 },

    #[error("quantity {quantity} outside bounds [{min}, {max:?}]")]
    QuantityBounds {
        quantity: rust_decimal::Decimal,
        min: rust_decimal::Decimal,
        max: Option<rust_decimal::Decimal>,
    },

    #[error("price must be positive, got {0}")]
    NonPositivePrice(rust_decimal::Decimal),

    #[error("price precision {actual} does not match instrument precision {expected}")]
    PricePrecision { expected: u8, actual: u8 },

    #[error("price {price} outside bounds [{min:?}, {max:?}]")]
    PriceBounds {
        price: rust_decimal::Decimal,
        min: Option<rust_decimal::Decimal>,
        max: Option<rust_decimal::Decimal>,
    },
}
