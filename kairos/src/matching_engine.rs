use kairos_execution::{Order, OrderEvent, OrderKind};
use kairos_instrument::{Bar, Instrument, Money, Price, Side, TradeId, VenueOrderId};

/// A fill the matching engine computed against a bar, ready for the simulated exchange to turn
/// into balance updates and an `OrderEvent::Filled`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedFill {
    pub client_order_id: kairos_instrument::ClientOrderId,
    pub trade_id: TradeId,
    pub price: Price,
    pub quantity: kairos_instrument::Quantity,
    pub commission: Money,
}

/// Determines whether `order` fills against `bar`'s OHLC, and at what price, per the
/// fill-check policy table (`spec.md` §4.4).
///
/// Only full fills are modeled - if the policy says an order fills, it fills for its entire
/// `leaves_qty` (`spec.md` §1 Non-goals: "partial fills at the matching-engine level").
fn fill_price(kind: &OrderKind, side: Side, bar: &Bar) -> Option<Price> {
    let o = bar.open;
    let h = bar.high;
    let l = bar.low;

    match (kind, side) {
        (OrderKind::Market, _) => Some(o),

        (OrderKind::Limit { price }, Side::Buy) => {
            (l.value() <= price.value()).then(|| Price::new(price.value().min(o.value()), price.precision()))
        }
        (OrderKind::Limit { price }, Side::Sell) => {
            (h.value() >= price.value()).then(|| Price::new(price.value().max(o.value()), price.precision()))
        }

        (OrderKind::StopMarket { trigger_price }, Side::Buy) => (h.value() >= trigger_price.value())
            .then(|| Price::new(trigger_price.value().max(o.value()), trigger_price.precision())),
        (OrderKind::StopMarket { trigger_price }, Side::Sell) => (l.value() <= trigger_price.value())
            .then(|| Price::new(trigger_price.value().min(o.value()), trigger_price.precision())),

        (OrderKind::StopLimit { trigger_price, price }, Side::Buy) => {
            (h.value() >= trigger_price.value() && l.value() <= price.value()).then_some(*price)
        }
        (OrderKind::StopLimit { trigger_price, price }, Side::Sell) => {
            (l.value() <= trigger_price.value() && h.value() >= price.value()).then_some(*price)
        }
    }
}

/// The open-order book and fill-check logic for one instrument at one venue.
///
/// Grounded in the teacher's `barter-execution` simulated-matching shape, generalised to the
/// single bar-driven fill-check policy table this kernel uses in place of order-book depth
/// matching (`spec.md` §4.4).
#[derive(Debug, Default)]
pub struct MatchingEngine {
    open_orders: indexmap::IndexMap<kairos_instrument::ClientOrderId, Order>,
    next_trade_seq: u64,
    next_venue_order_seq: u64,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `order` into the open-order book, returning the venue order id assigned.
    pub fn accept(&mut self, order: Order) -> VenueOrderId {
        self.next_venue_order_seq += 1;
        let venue_order_id = VenueOrderId::new(format!("V-{}", self.next_venue_order_seq));
        self.open_orders.insert(order.client_order_id.clone(), order);
        venue_order_id
    }

    pub fn cancel(&mut self, client_order_id: &kairos_instrument::ClientOrderId) -> bool {
        self.open_orders.shift_remove(client_order_id).is_some()
    }

    /// Update an order's working parameters in place, if still open.
    pub fn modify(
        &mut self,
        client_order_id: &kairos_instrument::ClientOrderId,
        new_quantity: Option<kairos_instrument::Quantity>,
        new_kind: Option<OrderKind>,
    ) -> bool {
        let Some(order) = self.open_orders.get_mut(client_order_id) else {
            return false;
        };
        if let Some(quantity) = new_quantity {
            order.quantity = quantity;
            order.leaves_qty = quantity;
        }
        if let Some(kind) = new_kind {
            order.kind = kind;
        }
        true
    }

    /// Evaluate every open order against `bar`'s OHLC, in the order they were accepted,
    /// removing any that fill and returning the fills produced (`spec.md` §4.4: "orders are
    /// evaluated in acceptance order; each bar fills at most the leaves quantity of an order").
    pub fn process_bar(&mut self, instrument: &Instrument, bar: &Bar) -> Vec<MatchedFill> {
        let mut fills = Vec::new();
        let mut filled_ids = Vec::new();

        for (client_order_id, order) in self.open_orders.iter() {
            let Some(price) = fill_price(&order.kind, order.side, bar) else {
                continue;
            };

            self.next_trade_seq += 1;
            let trade_id = TradeId::new(format!("T-{}", self.next_trade_seq));
            let notional = price.value() * order.leaves_qty.value() * instrument.spec.multiplier;
            let commission = Money::new(notional * instrument.spec.taker_fee, instrument.quote_currency.clone());

            fills.push(MatchedFill {
                client_order_id: client_order_id.clone(),
                trade_id,
                price,
                quantity: order.leaves_qty,
                commission,
            });
            filled_ids.push(client_order_id.clone());
        }

        for id in filled_ids {
            self.open_orders.shift_remove(&id);
        }

        fills
    }
}

impl MatchedFill {
    /// Build the [`OrderEvent::Filled`] this match corresponds to.
    pub fn into_event(self, ts_event: i64) -> OrderEvent {
        OrderEvent::Filled {
            trade_id: self.trade_id,
            last_qty: self.quantity,
            last_px: self.price,
            commission: self.commission,
            ts_event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_execution::TimeInForce;
    use kairos_instrument::{
        BarAggregation, BarSpec, BarType, ClientOrderId, Currency, InstrumentId, InstrumentSpec,
        PriceType, Quantity, StrategyId,
    };
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument::equity(
            InstrumentId::new("AAPL", "SIM"),
            Currency::usd(),
            InstrumentSpec::simple(2, 0).with_taker_fee(dec!(0.001)),
        )
    }

    fn bar(open: &str, high: &str, low: &str, close: &str) -> Bar {
        Bar {
            bar_type: BarType {
                instrument_id: InstrumentId::new("AAPL", "SIM"),
                spec: BarSpec::new(1, BarAggregation::Day, PriceType::Trade),
            },
            open: Price::new(open.parse().unwrap(), 2),
            high: Price::new(high.parse().unwrap(), 2),
            low: Price::new(low.parse().unwrap(), 2),
            close: Price::new(close.parse().unwrap(), 2),
            volume: Quantity::new(dec!(1000), 0).unwrap(),
            ts_event: 1,
            ts_init: 1,
        }
    }

    fn market_order(side: Side) -> Order {
        Order::new(
            ClientOrderId::new("O-1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            side,
            OrderKind::Market,
            Quantity::new(dec!(10), 0).unwrap(),
            TimeInForce::GoodTillCancel,
        )
    }

    #[test]
    fn market_order_always_fills_at_open() {
        let instrument = instrument();
        let mut engine = MatchingEngine::new();
        engine.accept(market_order(Side::Buy));

        let fills = engine.process_bar(&instrument, &bar("100.00", "105.00", "99.00", "103.00"));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price.value(), dec!(100.00));
    }

    #[test]
    fn buy_limit_fills_at_min_of_limit_and_open_when_low_touches_it() {
        let instrument = instrument();
        let mut engine = MatchingEngine::new();
        let mut order = market_order(Side::Buy);
        order.kind = OrderKind::Limit {
            price: Price::new(dec!(98.00), 2),
        };
        engine.accept(order);

        // low (97) <= limit (98): fills
        let fills = engine.process_bar(&instrument, &bar("100.00", "101.00", "97.00", "99.00"));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price.value(), dec!(98.00));
    }

    #[test]
    fn buy_limit_does_not_fill_when_low_stays_above_limit() {
        let instrument = instrument();
        let mut engine = MatchingEngine::new();
        let mut order = market_order(Side::Buy);
        order.kind = OrderKind::Limit {
            price: Price::new(dec!(90.00), 2),
        };
        engine.accept(order);

        let fills = engine.process_bar(&instrument, &bar("100.00", "101.00", "97.00", "99.00"));
        assert!(fills.is_empty());
    }

    #[test]
    fn stop_limit_buy_requires_both_trigger_touch_and_limit_touch() {
        let instrument = instrument();
        let mut engine = MatchingEngine::new();
        let mut order = market_order(Side::Buy);
        order.kind = OrderKind::StopLimit {
            trigger_price: Price::new(dec!(102.00), 2),
            price: Price::new(dec!(103.00), 2),
        };
        engine.accept(order);

        // high (105) >= trigger (102) and low (99) <= limit (103): fills at the limit price
        let fills = engine.process_bar(&instrument, &bar("100.00", "105.00", "99.00", "101.00"));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price.value(), dec!(103.00));
    }

    #[test]
    fn stop_limit_buy_does_not_fill_when_trigger_not_touched() {
        let instrument = instrument();
        let mut engine = MatchingEngine::new();
        let mut order = market_order(Side::Buy);
        order.kind = OrderKind::StopLimit {
            trigger_price: Price::new(dec!(110.00), 2),
            price: Price::new(dec!(111.00), 2),
        };
        engine.accept(order);

        let fills = engine.process_bar(&instrument, &bar("100.00", "105.00", "99.00", "101.00"));
        assert!(fills.is_empty());
    }

    #[test]
    fn commission_is_notional_times_taker_fee() {
        let instrument = instrument();
        let mut engine = MatchingEngine::new();
        engine.accept(market_order(Side::Buy));

        let fills = engine.process_bar(&instrument, &bar("100.00", "105.00", "99.00", "103.00"));
        // 10 units @ 100.00 * 0.001 taker fee = 1.00
        assert_eq!(fills[0].commission.amount, dec!(1.000));
    }
}
