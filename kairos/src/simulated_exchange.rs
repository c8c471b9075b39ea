use crate::matching_engine::MatchingEngine;
use kairos_execution::{Account, Order, OrderEvent};
use kairos_instrument::{Bar, ClientOrderId, Instrument, InstrumentId, Side, VenueOrderId};
use rust_decimal::Decimal;

/// Per-venue simulated exchange: owns the venue's [`Account`] and one [`MatchingEngine`] per
/// instrument, and turns matched fills into balance updates (`spec.md` §4.5).
///
/// Grounded in the teacher's simulated-exchange shape from `barter-execution`, adapted to this
/// kernel's single-venue-per-instance, bar-driven matching model.
#[derive(Debug)]
pub struct SimulatedExchange {
    pub account: Account,
    matching_engines: indexmap::IndexMap<InstrumentId, MatchingEngine>,
    next_venue_order_seq: u64,
}

impl SimulatedExchange {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            matching_engines: indexmap::IndexMap::new(),
            next_venue_order_seq: 0,
        }
    }

    fn engine_for(&mut self, instrument_id: &InstrumentId) -> &mut MatchingEngine {
        self.matching_engines
            .entry(instrument_id.clone())
            .or_insert_with(MatchingEngine::new)
    }

    /// Accept `order` into its instrument's matching engine, returning the `Accepted` event.
    pub fn process_order(&mut self, order: Order, ts_event: i64) -> OrderEvent {
        self.next_venue_order_seq += 1;
        let venue_order_id = VenueOrderId::new(format!("V-{}", self.next_venue_order_seq));

        let instrument_id = order.instrument_id.clone();
        self.engine_for(&instrument_id).accept(order);

        OrderEvent::Accepted {
            venue_order_id,
            ts_event,
        }
    }

    pub fn cancel_order(&mut self, instrument_id: &InstrumentId, client_order_id: &ClientOrderId) -> bool {
        self.engine_for(instrument_id).cancel(client_order_id)
    }

    pub fn modify_order(
        &mut self,
        instrument_id: &InstrumentId,
        client_order_id: &ClientOrderId,
        new_quantity: Option<kairos_instrument::Quantity>,
        new_kind: Option<kairos_execution::OrderKind>,
    ) -> bool {
        self.engine_for(instrument_id)
            .modify(client_order_id, new_quantity, new_kind)
    }

    /// Run `bar` through the instrument's matching engine, applying every resulting fill's
    /// notional and commission to the account balance and returning `(client_order_id,
    /// OrderEvent::Filled)` pairs for the execution engine to dispatch.
    ///
    /// Balance update: `new_total = old_total + signed_notional - commission`, where
    /// `signed_notional` is positive for a SELL (cash in) and negative for a BUY (cash out)
    /// (`spec.md` §4.5).
    pub fn process_bar(
        &mut self,
        instrument: &Instrument,
        bar: &Bar,
        side_by_order: impl Fn(&ClientOrderId) -> Option<Side>,
        ts_event: i64,
    ) -> Vec<(ClientOrderId, OrderEvent)> {
        let instrument_id = instrument.id.clone();
        let fills = self.engine_for(&instrument_id).process_bar(instrument, bar);

        let mut events = Vec::with_capacity(fills.len());
        for fill in fills {
            let Some(side) = side_by_order(&fill.client_order_id) else {
                continue;
            };

            let notional = fill.price.value() * fill.quantity.value() * instrument.spec.multiplier;
            let signed_notional = match side {
                Side::Buy => -notional,
                Side::Sell => notional,
            };

            self.account
                .apply_pnl(&instrument.quote_currency, signed_notional);
            self.account.apply_commission(&fill.commission);

            let client_order_id = fill.client_order_id.clone();
            events.push((client_order_id, fill.into_event(ts_event)));
        }

        events
    }

    pub fn total_balance(&self, currency: &kairos_instrument::Currency) -> Decimal {
        self.account.balance(currency).map(|b| b.total).unwrap_or_default()
    }
}
