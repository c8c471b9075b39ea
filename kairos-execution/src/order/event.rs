use kairos_instrument::{Money, Price, Quantity, TradeId, VenueOrderId};
use serde::{Deserialize, Serialize};

/// The only way an [`Order`](super::Order)'s state mutates - it is event-sourced (`spec.md`
/// §3: "Orders are event-sourced: mutations happen only by applying an event").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum OrderEvent {
    /// The risk engine refused the order before it reached a venue.
    Denied { reason: String, ts_event: i64 },
    /// The order passed the risk gate and was persisted/routed to the venue.
    Submitted { ts_event: i64 },
    /// The venue accepted the order into its open-order book.
    Accepted {
        venue_order_id: VenueOrderId,
        ts_event: i64,
    },
    /// The venue rejected the order (distinct from a pre-trade risk denial).
    Rejected { reason: String, ts_event: i64 },
    /// The order was cancelled, either by the strategy or by the venue.
    Canceled { ts_event: i64 },
    /// The order's time in force expired before it could fill.
    Expired { ts_event: i64 },
    /// A stop order's trigger condition was met.
    Triggered { ts_event: i64 },
    /// A modify request was accepted by the venue, applying to currently-working quantity.
    PendingUpdate { ts_event: i64 },
    /// A cancel request is in flight at the venue.
    PendingCancel { ts_event: i64 },
    /// The venue confirmed a modify, carrying the new working parameters.
    Updated {
        new_quantity: Quantity,
        new_price: Option<Price>,
        new_trigger_price: Option<Price>,
        ts_event: i64,
    },
    /// The matching engine produced a fill.
    Filled {
        trade_id: TradeId,
        last_qty: Quantity,
        last_px: Price,
        commission: Money,
        ts_event: i64,
    },
}

impl OrderEvent {
    pub fn ts_event(&self) -> i64 {
        match self {
            OrderEvent::Denied { ts_event, .. }
            | OrderEvent::Submitted { ts_event }
            | OrderEvent::Accepted { ts_event, .. }
            | OrderEvent::Rejected { ts_event, .. }
            | OrderEvent::Canceled { ts_event }
            | OrderEvent::Expired { ts_event }
            | OrderEvent::Triggered { ts_event }
            | OrderEvent::PendingUpdate { ts_event }
            | OrderEvent::PendingCancel { ts_event }
            | OrderEvent::Updated { ts_event, .. }
            | OrderEvent::Filled { ts_event, .. } => *ts_event,
        }
    }
}
