use crate::error::ExecutionError;
use kairos_instrument::{ClientOrderId, InstrumentId, Price, Quantity, Side, StrategyId, VenueOrderId};
use serde::{Deserialize, Serialize};

/// The order's lifecycle state and the transition table that governs it.
pub mod status;

/// [`OrderEvent`](event::OrderEvent), the only way an order mutates.
pub mod event;

pub use event::OrderEvent;
pub use status::OrderStatus;

/// How long an order remains working at the venue.
///
/// Mirrors the options a real venue would offer; the matching engine in this kernel only
/// models the fill-or-no-fill-this-bar policy of `spec.md` §4.4, so `time_in_force` is
/// currently bookkeeping rather than behaviour-changing, except where a strategy or future
/// extension inspects it directly.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum TimeInForce {
    GoodTillCancel,
    GoodTillEndOfDay,
    FillOrKill,
    ImmediateOrCancel,
}

/// The kind-specific parameters of an [`Order`] that the matching engine's fill-check policy
/// reads (`spec.md` §4.4).
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub enum OrderKind {
    Market,
    Limit { price: Price },
    StopMarket { trigger_price: Price },
    StopLimit { trigger_price: Price, price: Price },
}

impl OrderKind {
    pub fn price(&self) -> Option<Price> {
        match self {
            OrderKind::Limit { price } => Some(*price),
            OrderKind::StopLimit { price, .. } => Some(*price),
            _ => None,
        }
    }

    pub fn trigger_price(&self) -> Option<Price> {
        match self {
            OrderKind::StopMarket { trigger_price } => Some(*trigger_price),
            OrderKind::StopLimit { trigger_price, .. } => Some(*trigger_price),
            _ => None,
        }
    }
}

/// An event-sourced order: all fields but `event_log` are derived by replaying
/// [`OrderEvent`]s via [`Order::apply`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub instrument_id: InstrumentId,
    pub strategy_id: StrategyId,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: Quantity,
    pub filled_qty: Quantity,
    pub leaves_qty: Quantity,
    pub avg_px: Option<Price>,
    pub status: OrderStatus,
    pub time_in_force: TimeInForce,
    pub event_log: Vec<OrderEvent>,
}

impl Order {
    /// Construct a new order in [`OrderStatus::Initialized`].
    pub fn new(
        client_order_id: ClientOrderId,
        instrument_id: InstrumentId,
        strategy_id: StrategyId,
        side: Side,
        kind: OrderKind,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> Self {
        let leaves_qty = quantity;

        Self {
            client_order_id,
            venue_order_id: None,
            instrument_id,
            strategy_id,
            side,
            kind,
            quantity,
            filled_qty: Quantity::zero(quantity.precision()),
            leaves_qty,
            avg_px: None,
            status: OrderStatus::Initialized,
            time_in_force,
            event_log: Vec::new(),
        }
    }

    /// Apply `event`, enforcing the FSM transition table (`spec.md` §4.8).
    ///
    /// # Errors
    /// Returns [`ExecutionError::InvariantViolation`] if `event` is not a legal transition from
    /// the order's current [`OrderStatus`], or if an [`OrderEvent::Updated`] would shrink the
    /// working quantity below what has already filled.
    pub fn apply(&mut self, event: OrderEvent) -> Result<(), ExecutionError> {
        let next_status = self.next_status(&event)?;

        if !self.status.can_transition_to(next_status) {
            tracing::error!(
                order = %self.client_order_id,
                from = ?self.status,
                to = ?next_status,
                ?event,
                "order FSM rejected illegal transition"
            );
            return Err(ExecutionError::illegal_transition(
                &self.client_order_id,
                self.status,
                event,
            ));
        }

        match &event {
            OrderEvent::Accepted { venue_order_id, .. } => {
                self.venue_order_id = Some(venue_order_id.clone());
            }
            OrderEvent::Updated { new_quantity, .. } => {
                if new_quantity.value() < self.filled_qty.value() {
                    return Err(ExecutionError::InvariantViolation(format!(
                        "order {} modify to quantity {} below filled quantity {}",
                        self.client_order_id,
                        new_quantity,
                        self.filled_qty
                    )));
                }
                self.quantity = *new_quantity;
                self.leaves_qty = self.quantity.checked_sub(&self.filled_qty)?;
            }
            OrderEvent::Filled {
                last_qty, last_px, ..
            } => {
                let filled_qty_prev = self.filled_qty;
                let filled_qty_new = self.filled_qty.checked_add(last_qty)?;

                let avg_px_prev = self.avg_px.map(|p| p.value()).unwrap_or_default();
                let weighted = (avg_px_prev * filled_qty_prev.value()
                    + last_px.value() * last_qty.value())
                    / filled_qty_new.value();

                self.filled_qty = filled_qty_new;
                self.leaves_qty = self.quantity.checked_sub(&self.filled_qty)?;
                self.avg_px = Some(Price::new(weighted, last_px.precision()));
            }
            _ => {}
        }

        self.status = next_status;
        self.event_log.push(event);

        Ok(())
    }

    /// Compute the status `event` would transition this order to, without mutating anything.
    fn next_status(&self, event: &OrderEvent) -> Result<OrderStatus, ExecutionError> {
        Ok(match event {
            OrderEvent::Denied { .. } => OrderStatus::Denied,
            OrderEvent::Submitted { .. } => OrderStatus::Submitted,
            OrderEvent::Accepted { .. } => OrderStatus::Accepted,
            OrderEvent::Rejected { .. } => OrderStatus::Rejected,
            OrderEvent::Canceled { .. } => OrderStatus::Canceled,
            OrderEvent::Expired { .. } => OrderStatus::Expired,
            OrderEvent::Triggered { .. } => OrderStatus::Triggered,
            OrderEvent::PendingUpdate { .. } => OrderStatus::PendingUpdate,
            OrderEvent::PendingCancel { .. } => OrderStatus::PendingCancel,
            OrderEvent::Updated { .. } => OrderStatus::Accepted,
            OrderEvent::Filled { last_qty, .. } => {
                let filled_qty_new = self.filled_qty.checked_add(last_qty)?;
                if filled_qty_new.value() >= self.quantity.value() {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_instrument::{Money, Currency, InstrumentId, TradeId};
    use rust_decimal_macros::dec;

    fn new_order() -> Order {
        Order::new(
            ClientOrderId::new("O-1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            Side::Buy,
            OrderKind::Market,
            Quantity::new(dec!(100), 0).unwrap(),
            TimeInForce::GoodTillCancel,
        )
    }

    #[test]
    fn fsm_rejects_filled_event_from_initialized() {
        let mut order = new_order();
        let result = order.apply(OrderEvent::Filled {
            trade_id: TradeId::new("t1"),
            last_qty: Quantity::new(dec!(100), 0).unwrap(),
            last_px: Price::new(dec!(100), 2),
            commission: Money::zero(Currency::usd()),
            ts_event: 1,
        });

        assert!(matches!(result, Err(ExecutionError::InvariantViolation(_))));
        assert_eq!(order.status, OrderStatus::Initialized);
    }

    #[test]
    fn full_lifecycle_to_filled_updates_avg_px_and_leaves_qty() {
        let mut order = new_order();
        order.apply(OrderEvent::Submitted { ts_event: 1 }).unwrap();
        order
            .apply(OrderEvent::Accepted {
                venue_order_id: VenueOrderId::new("V-1"),
                ts_event: 2,
            })
            .unwrap();

        order
            .apply(OrderEvent::Filled {
                trade_id: TradeId::new("t1"),
                last_qty: Quantity::new(dec!(40), 0).unwrap(),
                last_px: Price::new(dec!(100), 2),
                commission: Money::zero(Currency::usd()),
                ts_event: 3,
            })
            .unwrap();

        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_qty.value(), dec!(40));
        assert_eq!(order.leaves_qty.value(), dec!(60));
        assert_eq!(order.avg_px.unwrap().value(), dec!(100));

        order
            .apply(OrderEvent::Filled {
                trade_id: TradeId::new("t2"),
                last_qty: Quantity::new(dec!(60), 0).unwrap(),
                last_px: Price::new(dec!(102), 2),
                commission: Money::zero(Currency::usd()),
                ts_event: 4,
            })
            .unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_qty, order.quantity);
        assert_eq!(order.leaves_qty.value(), dec!(0));
        // weighted avg: (40*100 + 60*102) / 100 = 101.2
        assert_eq!(order.avg_px.unwrap().value(), dec!(101.2));
    }

    #[test]
    fn update_rejects_quantity_below_filled() {
        let mut order = new_order();
        order.apply(OrderEvent::Submitted { ts_event: 1 }).unwrap();
        order
            .apply(OrderEvent::Accepted {
                venue_order_id: VenueOrderId::new("V-1"),
                ts_event: 2,
            })
            .unwrap();
        order
            .apply(OrderEvent::Filled {
                trade_id: TradeId::new("t1"),
                last_qty: Quantity::new(dec!(80), 0).unwrap(),
                last_px: Price::new(dec!(100), 2),
                commission: Money::zero(Currency::usd()),
                ts_event: 3,
            })
            .unwrap();

        let result = order.apply(OrderEvent::Updated {
            new_quantity: Quantity::new(dec!(50), 0).unwrap(),
            new_price: None,
            new_trigger_price: None,
            ts_event: 4,
        });

        assert!(result.is_err());
    }

    #[test]
    fn terminal_order_rejects_further_events() {
        let mut order = new_order();
        order.apply(OrderEvent::Denied {
            reason: "test".into(),
            ts_event: 1,
        })
        .unwrap();

        let result = order.apply(OrderEvent::Submitted { ts_event: 2 });
        assert!(result.is_err());
    }
}
