use crate::bus::{Message, MessageBus};
use crate::cache::Cache;
use kairos_instrument::{Bar, QuoteTick, TradeTick};

/// Topic under which a [`Bar`] of `bar_type` is published (`spec.md` §6's topic grammar).
pub fn bar_topic(bar_type: &kairos_instrument::BarType) -> String {
    format!("data.bars.{}", bar_type)
}

/// Topic under which a [`QuoteTick`] for `instrument_id` is published.
pub fn quote_topic(instrument_id: &kairos_instrument::InstrumentId) -> String {
    format!("data.quotes.{}", instrument_id)
}

/// Topic under which a [`TradeTick`] for `instrument_id` is published.
pub fn trade_topic(instrument_id: &kairos_instrument::InstrumentId) -> String {
    format!("data.trades.{}", instrument_id)
}

/// Routes incoming market data into the [`Cache`]'s ordered sequences, then republishes it on
/// its topic for subscribers (`spec.md` §4.3: "a thin router, not a transform").
///
/// Holds no state of its own beyond the cache/bus it's handed - the driver owns both and calls
/// through this each time a data record needs to enter the system.
#[derive(Debug, Default)]
pub struct DataEngine;

impl DataEngine {
    pub fn new() -> Self {
        Self
    }

    /// Append `bar` to the cache and publish it on its `data.bars.*` topic.
    pub fn process_bar(&self, cache: &mut Cache, bus: &mut MessageBus, bar: Bar) {
        let topic = bar_topic(&bar.bar_type);
        cache.add_bar(bar.clone());
        bus.publish(&topic, &Message::Bar(bar));
    }

    /// Append `quote` to the cache and publish it on its `data.quotes.*` topic.
    pub fn process_quote(&self, cache: &mut Cache, bus: &mut MessageBus, quote: QuoteTick) {
        let topic = quote_topic(&quote.instrument_id);
        cache.add_quote(quote.clone());
        bus.publish(&topic, &Message::Quote(quote));
    }

    /// Append `trade` to the cache and publish it on its `data.trades.*` topic.
    pub fn process_trade(&self, cache: &mut Cache, bus: &mut MessageBus, trade: TradeTick) {
        let topic = trade_topic(&trade.instrument_id);
        cache.add_trade(trade.clone());
        bus.publish(&topic, &Message::Trade(trade));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_instrument::{BarAggregation, BarSpec, BarType, InstrumentId, Price, PriceType, Quantity};
    use rust_decimal::Decimal;
    use std::{cell::RefCell, rc::Rc};

    fn sample_bar() -> Bar {
        Bar {
            bar_type: BarType {
                instrument_id: InstrumentId::new("AAPL", "SIM"),
                spec: BarSpec {
                    step: 1,
                    aggregation: BarAggregation::Minute,
                    price_type: PriceType::Trade,
                },
            },
            open: Price::new(Decimal::ONE, 2),
            high: Price::new(Decimal::ONE, 2),
            low: Price::new(Decimal::ONE, 2),
            close: Price::new(Decimal::ONE, 2),
            volume: Quantity::new(Decimal::ONE, 0).unwrap(),
            ts_event: 1,
            ts_init: 1,
        }
    }

    #[test]
    fn process_bar_appends_to_cache_and_publishes_on_its_topic() {
        let mut cache = Cache::new();
        let mut bus = MessageBus::new();
        let engine = DataEngine::new();

        let received = Rc::new(RefCell::new(false));
        let received_clone = received.clone();
        let bar = sample_bar();
        bus.subscribe(
            bar_topic(&bar.bar_type),
            Box::new(move |_| *received_clone.borrow_mut() = true),
        );

        engine.process_bar(&mut cache, &mut bus, bar.clone());

        assert_eq!(cache.bars(&bar.bar_type).len(), 1);
        assert!(*received.borrow());
    }
}
