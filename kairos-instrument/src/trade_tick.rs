use crate::{identifier::InstrumentId, price::Price, quantity::Quantity, Side};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies a venue-reported trade print, distinct from an execution-side [`TradeId`]
/// (`crate::TradeId`) minted by the matching engine for a fill.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub struct MarketTradeId(pub smol_str::SmolStr);

impl MarketTradeId {
    pub fn new<S: Into<smol_str::SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

/// A single reported market trade (print), with the aggressor [`Side`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeTick {
    pub instrument_id: InstrumentId,
    pub price: Price,
    pub size: Quantity,
    pub aggressor_side: Side,
    pub trade_id: MarketTradeId,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl TradeTick {
    pub fn new(
        instrument_id: InstrumentId,
        price: Price,
        size: Quantity,
        aggressor_side: Side,
        trade_id: MarketTradeId,
        ts_event: i64,
        ts_init: i64,
    ) -> Self {
        Self {
            instrument_id,
            price,
            size,
            aggressor_side,
            trade_id,
            ts_event,
            ts_init,
        }
    }
}
