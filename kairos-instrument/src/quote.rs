use crate::{identifier::InstrumentId, price::Price, quantity::Quantity};
use serde::{Deserialize, Serialize};

/// A top-of-book bid/ask quote.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuoteTick {
    pub instrument_id: InstrumentId,
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_size: Quantity,
    pub ask_size: Quantity,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl QuoteTick {
    pub fn new(
        instrument_id: InstrumentId,
        bid_price: Price,
        ask_price: Price,
        bid_size: Quantity,
        ask_size: Quantity,
        ts_event: i64,
        ts_init: i64,
    ) -> Self {
        Self {
            instrument_id,
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            ts_event,
            ts_init,
        }
    }
}
