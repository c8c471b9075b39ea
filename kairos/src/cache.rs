use indexmap::IndexMap;
use kairos_execution::{Order, Position};
use kairos_instrument::{
    Bar, BarType, ClientOrderId, Instrument, InstrumentId, PositionId, QuoteTick, StrategyId,
    TradeTick, TradingState, Venue,
};
use kairos_risk::RiskDataProvider;

/// The kernel's in-memory state store: every entity the engines and strategies touch, owned by
/// strongly-typed maps keyed on identifiers, plus the secondary indexes the portfolio/risk
/// engine need for cross-cutting lookups (`spec.md` §3, §9: "the cache owns all entity records;
/// engines hold references by identifier and look up through the cache").
///
/// Every map is an [`IndexMap`] so iteration anywhere in this type stays insertion-ordered.
#[derive(Debug, Default)]
pub struct Cache {
    instruments: IndexMap<InstrumentId, Instrument>,
    orders: IndexMap<ClientOrderId, Order>,
    positions: IndexMap<PositionId, Position>,

    orders_by_venue: IndexMap<Venue, Vec<ClientOrderId>>,
    orders_by_strategy: IndexMap<StrategyId, Vec<ClientOrderId>>,
    orders_by_instrument: IndexMap<InstrumentId, Vec<ClientOrderId>>,

    positions_by_venue: IndexMap<Venue, Vec<PositionId>>,
    positions_by_strategy: IndexMap<StrategyId, Vec<PositionId>>,
    positions_by_instrument: IndexMap<InstrumentId, Vec<PositionId>>,

    bars: IndexMap<BarType, Vec<Bar>>,
    quotes: IndexMap<InstrumentId, Vec<QuoteTick>>,
    trades: IndexMap<InstrumentId, Vec<TradeTick>>,

    trading_state: TradingState,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trading_state(&self) -> TradingState {
        self.trading_state
    }

    pub fn set_trading_state(&mut self, state: TradingState) {
        self.trading_state = state;
    }

    /// Clear every order, position, and market-data record a run has accumulated, leaving
    /// registered instruments and `trading_state` untouched - used by the backtest driver's
    /// `reset()` to replay the same instrument universe from a clean slate.
    pub fn clear_run_state(&mut self) {
        self.orders.clear();
        self.positions.clear();
        self.orders_by_venue.clear();
        self.orders_by_strategy.clear();
        self.orders_by_instrument.clear();
        self.positions_by_venue.clear();
        self.positions_by_strategy.clear();
        self.positions_by_instrument.clear();
        self.bars.clear();
        self.quotes.clear();
        self.trades.clear();
    }

    // -- instruments --

    pub fn add_instrument(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.id.clone(), instrument);
    }

    pub fn instrument(&self, instrument_id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.get(instrument_id)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn all_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    // -- orders --

    /// Insert `order`, indexing it under its venue's identity, strategy and instrument.
    pub fn add_order(&mut self, order: Order, venue: Venue) {
        let client_order_id = order.client_order_id.clone();

        self.orders_by_venue
            .entry(venue)
            .or_default()
            .push(client_order_id.clone());
        self.orders_by_strategy
            .entry(order.strategy_id.clone())
            .or_default()
            .push(client_order_id.clone());
        self.orders_by_instrument
            .entry(order.instrument_id.clone())
            .or_default()
            .push(client_order_id.clone());

        self.orders.insert(client_order_id, order);
    }

    pub fn order(&self, client_order_id: &ClientOrderId) -> Option<&Order> {
        self.orders.get(client_order_id)
    }

    pub fn order_mut(&mut self, client_order_id: &ClientOrderId) -> Option<&mut Order> {
        self.orders.get_mut(client_order_id)
    }

    pub fn orders_for_strategy(&self, strategy_id: &StrategyId) -> Vec<&Order> {
        self.orders_by_strategy
            .get(strategy_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    pub fn orders_for_instrument(&self, instrument_id: &InstrumentId) -> Vec<&Order> {
        self.orders_by_instrument
            .get(instrument_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    pub fn orders_for_venue(&self, venue: &Venue) -> Vec<&Order> {
        self.orders_by_venue
            .get(venue)
            .into_iter()
            .flatten()
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    // -- positions --

    pub fn add_position(&mut self, position: Position, venue: Venue) {
        let id = position.id.clone();

        self.positions_by_venue.entry(venue).or_default().push(id.clone());
        self.positions_by_strategy
            .entry(position.strategy_id.clone())
            .or_default()
            .push(id.clone());
        self.positions_by_instrument
            .entry(position.instrument_id.clone())
            .or_default()
            .push(id.clone());

        self.positions.insert(id, position);
    }

    pub fn position(&self, position_id: &PositionId) -> Option<&Position> {
        self.positions.get(position_id)
    }

    pub fn position_mut(&mut self, position_id: &PositionId) -> Option<&mut Position> {
        self.positions.get_mut(position_id)
    }

    /// The open positions for `(instrument_id, strategy_id)`, in the order they were opened.
    /// Under `NETTING` this is at most one; under `HEDGING` it may be several.
    pub fn open_positions_for(
        &self,
        instrument_id: &InstrumentId,
        strategy_id: &StrategyId,
    ) -> Vec<&Position> {
        self.positions_by_instrument
            .get(instrument_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.positions.get(id))
            .filter(|position| &position.strategy_id == strategy_id && !position.is_closed())
            .collect()
    }

    pub fn positions_for_strategy(&self, strategy_id: &StrategyId) -> Vec<&Position> {
        self.positions_by_strategy
            .get(strategy_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.positions.get(id))
            .collect()
    }

    pub fn positions_for_venue(&self, venue: &Venue) -> Vec<&Position> {
        self.positions_by_venue
            .get(venue)
            .into_iter()
            .flatten()
            .filter_map(|id| self.positions.get(id))
            .collect()
    }

    // -- market data --

    pub fn add_bar(&mut self, bar: Bar) {
        self.bars.entry(bar.bar_type.clone()).or_default().push(bar);
    }

    pub fn bars(&self, bar_type: &BarType) -> &[Bar] {
        self.bars.get(bar_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_quote(&mut self, quote: QuoteTick) {
        self.quotes
            .entry(quote.instrument_id.clone())
            .or_default()
            .push(quote);
    }

    pub fn quotes(&self, instrument_id: &InstrumentId) -> &[QuoteTick] {
        self.quotes.get(instrument_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_trade(&mut self, trade: TradeTick) {
        self.trades
            .entry(trade.instrument_id.clone())
            .or_default()
            .push(trade);
    }

    pub fn trades(&self, instrument_id: &InstrumentId) -> &[TradeTick] {
        self.trades.get(instrument_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl RiskDataProvider for Cache {
    fn trading_state(&self) -> TradingState {
        self.trading_state
    }

    fn instrument(&self, instrument_id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.get(instrument_id)
    }

    fn net_position_qty(
        &self,
        instrument_id: &InstrumentId,
        strategy_id: &StrategyId,
    ) -> rust_decimal::Decimal {
        self.open_positions_for(instrument_id, strategy_id)
            .iter()
            .map(|position| position.signed_qty)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_execution::{OrderKind, PositionFill, TimeInForce};
    use kairos_instrument::{Currency, InstrumentSpec, Money, Quantity, Side, TradeId, Price};
    use rust_decimal_macros::dec;

    fn aapl() -> Instrument {
        Instrument::equity(
            InstrumentId::new("AAPL", "SIM"),
            Currency::usd(),
            InstrumentSpec::simple(2, 0),
        )
    }

    #[test]
    fn secondary_indexes_find_orders_by_venue_strategy_and_instrument() {
        let mut cache = Cache::new();
        let order = Order::new(
            ClientOrderId::new("O-1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            Side::Buy,
            OrderKind::Market,
            Quantity::new(dec!(1), 0).unwrap(),
            TimeInForce::GoodTillCancel,
        );
        cache.add_order(order, Venue::new("SIM"));

        assert_eq!(cache.orders_for_venue(&Venue::new("SIM")).len(), 1);
        assert_eq!(cache.orders_for_strategy(&StrategyId::new("s1")).len(), 1);
        assert_eq!(
            cache
                .orders_for_instrument(&InstrumentId::new("AAPL", "SIM"))
                .len(),
            1
        );
    }

    #[test]
    fn net_position_qty_sums_open_positions_for_netting_and_hedging() {
        let mut cache = Cache::new();
        let fill = PositionFill {
            trade_id: TradeId::new("t1"),
            side: Side::Buy,
            last_qty: Quantity::new(dec!(10), 0).unwrap(),
            last_px: Price::new(dec!(100), 2),
            commission: Money::zero(Currency::usd()),
            ts_event: 1,
        };
        let position = Position::open(
            PositionId::new("p1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            &fill,
        );
        cache.add_position(position, Venue::new("SIM"));

        let qty = cache.net_position_qty(&InstrumentId::new("AAPL", "SIM"), &StrategyId::new("s1"));
        assert_eq!(qty, dec!(10));
    }

    #[test]
    fn instrument_lookup_round_trips() {
        let mut cache = Cache::new();
        cache.add_instrument(aapl());
        assert!(cache.instrument(&InstrumentId::new("AAPL", "SIM")).is_some());
        assert!(cache.instrument(&InstrumentId::new("MSFT", "SIM")).is_none());
    }
}
