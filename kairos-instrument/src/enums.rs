use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Side of an order, fill, or position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The sign applied to a fill quantity when accumulating a signed position quantity.
    pub fn signum(&self) -> i8 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order-management discipline governing how fills aggregate into positions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum OmsType {
    /// One position per `(instrument_id, strategy_id)`.
    Netting,
    /// Multiple simultaneous positions per instrument, addressed by `PositionId`.
    Hedging,
}

/// The kind of account backing a venue.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum AccountType {
    Cash,
    Margin { leverage: rust_decimal::Decimal },
}

/// Global trading state, checked first by the risk engine (`spec.md` §4.6).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Default)]
pub enum TradingState {
    #[default]
    Active,
    /// Denies any order that would increase the absolute net position for its instrument.
    Reducing,
    /// Denies everything.
    Halted,
}
