use crate::bus::{Message, MessageBus};
use crate::cache::Cache;
use crate::simulated_exchange::SimulatedExchange;
use kairos_execution::{ExecutionError, Order, OrderEvent, Position, PositionFill};
use kairos_instrument::{ClientOrderId, InstrumentId, OmsType, PositionId, Side, StrategyId};
use kairos_risk::{RiskDataProvider, RiskEngine};

/// Topic an order's lifecycle events are published on for the strategy that submitted it
/// (`spec.md` §6).
pub fn order_events_topic(strategy_id: &StrategyId) -> String {
    format!("events.order.{}", strategy_id.as_str())
}

/// Topic a position lifecycle event is published on (`spec.md` §6).
pub fn position_events_topic(strategy_id: &StrategyId) -> String {
    format!("events.position.{}", strategy_id.as_str())
}

/// Orchestrates an order's path from submission through the risk gate, to the venue, and the
/// resulting fills into position accounting - the hub `spec.md` §4.7 describes.
///
/// Holds no state itself; it is handed the cache, bus and venue exchange it coordinates each
/// call, mirroring the rest of this kernel's driver-owns-everything design (`spec.md` §5).
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    risk_engine: RiskEngine,
    next_position_seq: u64,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `order` through the risk gate. On denial, publish `OrderDenied` and do not persist
    /// the order. On approval, transition it to `Submitted`, persist it, and route it to
    /// `exchange` (`spec.md` §4.6/§4.7).
    pub fn submit_order(
        &mut self,
        mut order: Order,
        venue: kairos_instrument::Venue,
        cache: &mut Cache,
        bus: &mut MessageBus,
        exchange: &mut SimulatedExchange,
        ts_event: i64,
    ) -> Result<(), ExecutionError> {
        if let Err(reason) = self.risk_engine.check_order(&order, cache) {
            bus.publish(
                &order_events_topic(&order.strategy_id),
                &Message::OrderDenied {
                    strategy_id: order.strategy_id.clone(),
                    client_order_id: order.client_order_id.clone(),
                    reason: reason.to_string(),
                },
            );
            return Ok(());
        }

        order.apply(OrderEvent::Submitted { ts_event })?;

        let strategy_id = order.strategy_id.clone();
        let submitted_event = order.event_log.last().cloned().expect("just pushed");
        let order_for_bus = order.clone();

        let accepted = exchange.process_order(order.clone(), ts_event);
        order.apply(accepted.clone())?;

        cache.add_order(order.clone(), venue);

        bus.publish(
            &order_events_topic(&strategy_id),
            &Message::OrderEvent {
                strategy_id: strategy_id.clone(),
                order: order_for_bus,
                event: submitted_event,
            },
        );
        bus.publish(
            &order_events_topic(&strategy_id),
            &Message::OrderEvent {
                strategy_id,
                order,
                event: accepted,
            },
        );

        Ok(())
    }

    pub fn cancel_order(
        &mut self,
        client_order_id: &ClientOrderId,
        cache: &mut Cache,
        bus: &mut MessageBus,
        exchange: &mut SimulatedExchange,
        ts_event: i64,
    ) -> Result<(), ExecutionError> {
        let Some(order) = cache.order(client_order_id).cloned() else {
            return Ok(());
        };

        if exchange.cancel_order(&order.instrument_id, client_order_id) {
            self.apply_and_publish(cache, bus, client_order_id, OrderEvent::Canceled { ts_event })?;
        }
        Ok(())
    }

    /// Apply `event` to the cached order, publish it, and - for `Filled` events - dispatch the
    /// fill into position accounting per the account's `OmsType` (`spec.md` §4.7/§4.9).
    pub fn process_event(
        &mut self,
        cache: &mut Cache,
        bus: &mut MessageBus,
        client_order_id: &ClientOrderId,
        event: OrderEvent,
        oms_type: OmsType,
        venue: kairos_instrument::Venue,
    ) -> Result<(), ExecutionError> {
        if let OrderEvent::Filled {
            trade_id,
            last_qty,
            last_px,
            commission,
            ts_event,
        } = event.clone()
        {
            let order = cache
                .order(client_order_id)
                .cloned()
                .ok_or_else(|| ExecutionError::InvariantViolation(format!("unknown order {client_order_id}")))?;

            self.apply_fill_to_position(
                cache,
                bus,
                &order,
                PositionFill {
                    trade_id,
                    side: order.side,
                    last_qty,
                    last_px,
                    commission,
                    ts_event,
                },
                oms_type,
                venue,
            )?;
        }

        self.apply_and_publish(cache, bus, client_order_id, event)
    }

    fn apply_and_publish(
        &mut self,
        cache: &mut Cache,
        bus: &mut MessageBus,
        client_order_id: &ClientOrderId,
        event: OrderEvent,
    ) -> Result<(), ExecutionError> {
        let Some(order) = cache.order_mut(client_order_id) else {
            return Ok(());
        };
        order.apply(event.clone())?;
        let strategy_id = order.strategy_id.clone();
        let order_snapshot = order.clone();

        bus.publish(
            &order_events_topic(&strategy_id),
            &Message::OrderEvent {
                strategy_id,
                order: order_snapshot,
                event,
            },
        );
        Ok(())
    }

    fn apply_fill_to_position(
        &mut self,
        cache: &mut Cache,
        bus: &mut MessageBus,
        order: &Order,
        fill: PositionFill,
        oms_type: OmsType,
        venue: kairos_instrument::Venue,
    ) -> Result<(), ExecutionError> {
        let target = match oms_type {
            OmsType::Netting => cache
                .open_positions_for(&order.instrument_id, &order.strategy_id)
                .first()
                .map(|p| p.id.clone()),
            OmsType::Hedging => cache
                .open_positions_for(&order.instrument_id, &order.strategy_id)
                .first()
                .map(|p| p.id.clone()),
        };

        match target {
            None => {
                self.next_position_seq += 1;
                let position_id = PositionId::new(format!("P-{}", self.next_position_seq));
                let position = Position::open(
                    position_id,
                    order.instrument_id.clone(),
                    order.strategy_id.clone(),
                    &fill,
                );
                bus.publish(
                    &position_events_topic(&order.strategy_id),
                    &Message::PositionOpened(position.clone()),
                );
                cache.add_position(position, venue);
            }
            Some(position_id) => {
                let position = cache
                    .position_mut(&position_id)
                    .ok_or_else(|| ExecutionError::InvariantViolation(format!("unknown position {position_id}")))?;

                let flipped = position.apply(&fill)?;
                let closed = position.is_closed();
                let snapshot = position.clone();

                let topic = position_events_topic(&order.strategy_id);
                if closed {
                    bus.publish(&topic, &Message::PositionClosed(snapshot));
                } else {
                    bus.publish(&topic, &Message::PositionChanged(snapshot));
                }

                if let Some(new_leg) = flipped {
                    bus.publish(&topic, &Message::PositionOpened(new_leg.clone()));
                    cache.add_position(new_leg, venue);
                }
            }
        }

        Ok(())
    }
}

/// Which side of the market `order` sits on - used by the simulated exchange to compute signed
/// notional without needing to re-fetch the order itself.
pub fn side_of(order: &Order) -> Side {
    order.side
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_execution::{OrderKind, TimeInForce};
    use kairos_instrument::{
        AccountBalance, AccountType, Currency, Instrument, InstrumentSpec, Quantity, TradingState,
        Venue,
    };
    use kairos_execution::Account;
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument::equity(
            InstrumentId::new("AAPL", "SIM"),
            Currency::usd(),
            InstrumentSpec::simple(2, 0).with_quantity_bounds(dec!(1), None),
        )
    }

    fn setup() -> (Cache, MessageBus, SimulatedExchange) {
        let mut cache = Cache::new();
        cache.add_instrument(instrument());
        cache.set_trading_state(TradingState::Active);

        let mut account = Account::new(AccountType::Cash, Some(Currency::usd()));
        account.set_balance(AccountBalance::new(Currency::usd(), dec!(100_000), dec!(0)));

        (cache, MessageBus::new(), SimulatedExchange::new(account))
    }

    #[test]
    fn submit_order_denied_by_risk_publishes_order_denied_and_does_not_persist() {
        let (mut cache, mut bus, mut exchange) = setup();
        cache.set_trading_state(TradingState::Halted);

        let order = Order::new(
            ClientOrderId::new("O-1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            Side::Buy,
            OrderKind::Market,
            Quantity::new(dec!(10), 0).unwrap(),
            TimeInForce::GoodTillCancel,
        );

        let denied = std::rc::Rc::new(std::cell::RefCell::new(false));
        let denied_clone = denied.clone();
        bus.subscribe(
            order_events_topic(&StrategyId::new("s1")),
            Box::new(move |msg| {
                if matches!(msg, Message::OrderDenied { .. }) {
                    *denied_clone.borrow_mut() = true;
                }
            }),
        );

        let mut engine = ExecutionEngine::new();
        engine
            .submit_order(order, Venue::new("SIM"), &mut cache, &mut bus, &mut exchange, 1)
            .unwrap();

        assert!(*denied.borrow());
        assert!(cache.order(&ClientOrderId::new("O-1")).is_none());
    }

    #[test]
    fn submit_order_approved_transitions_to_accepted_and_is_persisted() {
        let (mut cache, mut bus, mut exchange) = setup();

        let order = Order::new(
            ClientOrderId::new("O-1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            Side::Buy,
            OrderKind::Market,
            Quantity::new(dec!(10), 0).unwrap(),
            TimeInForce::GoodTillCancel,
        );

        let mut engine = ExecutionEngine::new();
        engine
            .submit_order(order, Venue::new("SIM"), &mut cache, &mut bus, &mut exchange, 1)
            .unwrap();

        let persisted = cache.order(&ClientOrderId::new("O-1")).unwrap();
        assert_eq!(persisted.status, kairos_execution::OrderStatus::Accepted);
    }

    #[test]
    fn fill_opens_a_new_position_when_none_exists_under_netting() {
        let (mut cache, mut bus, _exchange) = setup();

        let order = Order::new(
            ClientOrderId::new("O-1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            Side::Buy,
            OrderKind::Market,
            Quantity::new(dec!(10), 0).unwrap(),
            TimeInForce::GoodTillCancel,
        );
        cache.add_order(order.clone(), Venue::new("SIM"));

        let mut engine = ExecutionEngine::new();
        engine
            .process_event(
                &mut cache,
                &mut bus,
                &ClientOrderId::new("O-1"),
                OrderEvent::Filled {
                    trade_id: kairos_instrument::TradeId::new("t1"),
                    last_qty: Quantity::new(dec!(10), 0).unwrap(),
                    last_px: kairos_instrument::Price::new(dec!(100), 2),
                    commission: kairos_instrument::Money::zero(Currency::usd()),
                    ts_event: 2,
                },
                OmsType::Netting,
                Venue::new("SIM"),
            )
            .unwrap();

        let positions = cache.positions_for_strategy(&StrategyId::new("s1"));
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].signed_qty, dec!(10));
    }
}
