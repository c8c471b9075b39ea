use crate::bus::Message;
use kairos_execution::{Order, OrderEvent, OrderKind, Position, TimeInForce};
use kairos_instrument::{Bar, BarType, ClientOrderId, InstrumentId, Quantity, QuoteTick, Side, StrategyId, TradeTick};
use rust_decimal::Decimal;

/// Monotonically increasing [`ClientOrderId`] minting for one strategy instance, of the form
/// `O-{strategy_id}-{n}` (`spec.md` §4.10).
#[derive(Debug)]
pub struct OrderFactory {
    strategy_id: StrategyId,
    next_seq: u64,
}

impl OrderFactory {
    pub fn new(strategy_id: StrategyId) -> Self {
        Self {
            strategy_id,
            next_seq: 0,
        }
    }

    pub fn next_client_order_id(&mut self) -> ClientOrderId {
        self.next_seq += 1;
        ClientOrderId::new(format!("O-{}-{}", self.strategy_id.as_str(), self.next_seq))
    }
}

/// Bar-type/quote/trade subscriptions and indicator registrations a strategy callback queues
/// through its [`StrategyContext`] (`spec.md` §4.10). The driver drains this after the callback
/// returns: it can't wire the bus subscription immediately, since the callback is itself running
/// from inside a bus dispatch.
#[derive(Default)]
pub struct Subscriptions {
    bars: Vec<BarType>,
    quotes: Vec<InstrumentId>,
    trades: Vec<InstrumentId>,
    indicators: Vec<(BarType, Box<dyn Indicator>)>,
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("bars", &self.bars)
            .field("quotes", &self.quotes)
            .field("trades", &self.trades)
            .field("indicators", &self.indicators.iter().map(|(bt, _)| bt).collect::<Vec<_>>())
            .finish()
    }
}

impl Subscriptions {
    /// Drain every queued request, in the order the strategy issued them.
    pub fn drain(
        &mut self,
    ) -> (Vec<BarType>, Vec<InstrumentId>, Vec<InstrumentId>, Vec<(BarType, Box<dyn Indicator>)>) {
        (
            std::mem::take(&mut self.bars),
            std::mem::take(&mut self.quotes),
            std::mem::take(&mut self.trades),
            std::mem::take(&mut self.indicators),
        )
    }
}

/// Handed to every [`Strategy`] callback: the one way a strategy reaches outside its own state,
/// namely to mint and queue new orders and wire up data subscriptions/indicators (`spec.md`
/// §4.10/§5 - strategies never touch the cache or bus directly).
///
/// Orders queued via [`StrategyContext::submit`] are drained by the backtest driver after the
/// callback returns and routed through the execution engine's risk gate; subscription/indicator
/// requests queued via [`StrategyContext::subscribe_bars`]/[`Self::register_indicator`] are
/// drained the same way and turned into real bus subscriptions.
#[derive(Debug)]
pub struct StrategyContext<'a> {
    factory: &'a mut OrderFactory,
    outbox: &'a mut Vec<Order>,
    subscriptions: &'a mut Subscriptions,
}

impl<'a> StrategyContext<'a> {
    pub fn new(factory: &'a mut OrderFactory, outbox: &'a mut Vec<Order>, subscriptions: &'a mut Subscriptions) -> Self {
        Self {
            factory,
            outbox,
            subscriptions,
        }
    }

    /// Mint a new order and queue it for submission, returning the [`ClientOrderId`] assigned
    /// so the strategy can correlate later events against it.
    pub fn submit(
        &mut self,
        instrument_id: InstrumentId,
        strategy_id: StrategyId,
        side: Side,
        kind: OrderKind,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> ClientOrderId {
        let client_order_id = self.factory.next_client_order_id();
        self.outbox.push(Order::new(
            client_order_id.clone(),
            instrument_id,
            strategy_id,
            side,
            kind,
            quantity,
            time_in_force,
        ));
        client_order_id
    }

    /// Wire a `data.bars.{bar_type}` subscription: each delivered bar first feeds every
    /// indicator registered against `bar_type` (in registration order), then calls `on_bar`
    /// (`spec.md` §4.10).
    pub fn subscribe_bars(&mut self, bar_type: BarType) {
        self.subscriptions.bars.push(bar_type);
    }

    /// Wire a `data.quotes.{instrument_id}` subscription: each delivered quote calls
    /// `on_quote_tick`.
    pub fn subscribe_quotes(&mut self, instrument_id: InstrumentId) {
        self.subscriptions.quotes.push(instrument_id);
    }

    /// Wire a `data.trades.{instrument_id}` subscription: each delivered trade calls
    /// `on_trade_tick`.
    pub fn subscribe_trades(&mut self, instrument_id: InstrumentId) {
        self.subscriptions.trades.push(instrument_id);
    }

    /// Register `indicator` against `bar_type`, fed in registration order ahead of `on_bar`
    /// whenever a bar for `bar_type` is delivered (`spec.md` §4.10). Pair with
    /// [`Self::subscribe_bars`] for the same `bar_type` - registering an indicator does not by
    /// itself subscribe to the bar type.
    pub fn register_indicator(&mut self, bar_type: BarType, indicator: Box<dyn Indicator>) {
        self.subscriptions.indicators.push((bar_type, indicator));
    }
}

/// A technical indicator fed one [`Bar`] at a time.
///
/// Indicator bodies (SMA/EMA/RSI/...) are out of scope (`spec.md` §1 Non-goals) - this trait
/// only defines the update contract a strategy's own indicators implement: `handle_bar` updates
/// internal state, `initialized` reports whether enough bars have been seen for `value` to be
/// meaningful, and `value` reports the indicator's current reading (`spec.md` §4.10).
pub trait Indicator {
    fn handle_bar(&mut self, bar: &Bar);
    fn initialized(&self) -> bool;

    /// The indicator's current value. Meaningless before [`Self::initialized`] returns `true`.
    fn value(&self) -> Decimal;
}

/// The lifecycle callbacks a backtest strategy implements (`spec.md` §4.10).
///
/// Every method has a no-op default: a strategy overrides only the events it cares about.
/// `ctx` gives access to the order factory and identity; actual order submission happens
/// through the backtest driver's API, not through this trait, keeping the strategy itself free
/// of direct cache/bus access (`spec.md` §5).
pub trait Strategy {
    fn id(&self) -> StrategyId;

    fn on_start(&mut self, _ctx: &mut StrategyContext<'_>) {}
    fn on_stop(&mut self, _ctx: &mut StrategyContext<'_>) {}
    fn on_reset(&mut self) {}

    fn on_bar(&mut self, _ctx: &mut StrategyContext<'_>, _bar: &Bar) {}
    fn on_quote_tick(&mut self, _ctx: &mut StrategyContext<'_>, _quote: &QuoteTick) {}
    fn on_trade_tick(&mut self, _ctx: &mut StrategyContext<'_>, _trade: &TradeTick) {}

    fn on_order_event(&mut self, _ctx: &mut StrategyContext<'_>, _order: &Order, _event: &OrderEvent) {}
    fn on_order_denied(&mut self, _ctx: &mut StrategyContext<'_>, _client_order_id: &ClientOrderId, _reason: &str) {}

    fn on_position_opened(&mut self, _ctx: &mut StrategyContext<'_>, _position: &Position) {}
    fn on_position_changed(&mut self, _ctx: &mut StrategyContext<'_>, _position: &Position) {}
    fn on_position_closed(&mut self, _ctx: &mut StrategyContext<'_>, _position: &Position) {}
}

/// Dispatches a bus [`Message`] to the relevant [`Strategy`] callback, filtering out events
/// addressed to other strategies.
pub fn dispatch(strategy: &mut dyn Strategy, ctx: &mut StrategyContext<'_>, message: &Message) {
    match message {
        Message::Bar(bar) => strategy.on_bar(ctx, bar),
        Message::Quote(quote) => strategy.on_quote_tick(ctx, quote),
        Message::Trade(trade) => strategy.on_trade_tick(ctx, trade),
        Message::OrderEvent {
            strategy_id,
            order,
            event,
        } if *strategy_id == strategy.id() => strategy.on_order_event(ctx, order, event),
        Message::OrderDenied {
            strategy_id,
            client_order_id,
            reason,
        } if *strategy_id == strategy.id() => strategy.on_order_denied(ctx, client_order_id, reason),
        Message::PositionOpened(position) if position.strategy_id == strategy.id() => {
            strategy.on_position_opened(ctx, position)
        }
        Message::PositionChanged(position) if position.strategy_id == strategy.id() => {
            strategy.on_position_changed(ctx, position)
        }
        Message::PositionClosed(position) if position.strategy_id == strategy.id() => {
            strategy.on_position_closed(ctx, position)
        }
        _ => {}
    }
}
