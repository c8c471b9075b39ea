use crate::{identifier::InstrumentId, price::Price, quantity::Quantity};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Price field a [`Bar`] was aggregated from (eg/ trade price vs mid-price).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum PriceType {
    Trade,
    Bid,
    Ask,
    Mid,
}

impl Display for PriceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PriceType::Trade => "trade",
            PriceType::Bid => "bid",
            PriceType::Ask => "ask",
            PriceType::Mid => "mid",
        };
        write!(f, "{s}")
    }
}

/// What a [`Bar`]'s `step` counts: a fixed time interval, a volume threshold, a tick count, ...
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum BarAggregation {
    Second,
    Minute,
    Hour,
    Day,
    Tick,
    Volume,
}

impl Display for BarAggregation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BarAggregation::Second => "second",
            BarAggregation::Minute => "minute",
            BarAggregation::Hour => "hour",
            BarAggregation::Day => "day",
            BarAggregation::Tick => "tick",
            BarAggregation::Volume => "volume",
        };
        write!(f, "{s}")
    }
}

/// `(step, aggregation, price_type)` specification of a [`Bar`]'s aggregation window.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[display("{step}-{aggregation}-{price_type}")]
pub struct BarSpec {
    pub step: u64,
    pub aggregation: BarAggregation,
    pub price_type: PriceType,
}

impl BarSpec {
    pub fn new(step: u64, aggregation: BarAggregation, price_type: PriceType) -> Self {
        Self {
            step,
            aggregation,
            price_type,
        }
    }
}

/// Composite key `(InstrumentId, BarSpec)` naming a specific bar series.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[display("{instrument_id}-{spec}")]
pub struct BarType {
    pub instrument_id: InstrumentId,
    pub spec: BarSpec,
}

impl BarType {
    pub fn new(instrument_id: InstrumentId, spec: BarSpec) -> Self {
        Self {
            instrument_id,
            spec,
        }
    }
}

/// An OHLCV aggregate bar for a fixed time window.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Bar {
    pub bar_type: BarType,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl Bar {
    pub fn new(
        bar_type: BarType,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        ts_event: i64,
        ts_init: i64,
    ) -> Self {
        Self {
            bar_type,
            open,
            high,
            low,
            close,
            volume,
            ts_event,
            ts_init,
        }
    }

    pub fn instrument_id(&self) -> &InstrumentId {
        &self.bar_type.instrument_id
    }
}
