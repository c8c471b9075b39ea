//! Buy-and-hold on a single bar: submits a market buy at startup, lets it fill against the
//! day's open, and prints the resulting balance and position count.
//!
//! Run with `cargo run -p kairos-demos --bin buy_and_hold`.

use kairos::{BacktestEngine, Strategy, StrategyContext};
use kairos_execution::{Account, OrderKind, TimeInForce};
use kairos_instrument::{
    AccountBalance, AccountType, Bar, BarAggregation, BarSpec, BarType, Currency, InstrumentId,
    InstrumentSpec, OmsType, Price, PriceType, Quantity, Side, StrategyId, Venue,
};
use rust_decimal_macros::dec;

struct BuyAndHold {
    id: StrategyId,
}

impl Strategy for BuyAndHold {
    fn id(&self) -> StrategyId {
        self.id.clone()
    }

    fn on_start(&mut self, ctx: &mut StrategyContext<'_>) {
        ctx.submit(
            InstrumentId::new("AAPL", "SIM"),
            self.id.clone(),
            Side::Buy,
            OrderKind::Market,
            Quantity::new(dec!(100), 0).unwrap(),
            TimeInForce::GoodTillCancel,
        );
    }

    fn on_position_opened(&mut self, _ctx: &mut StrategyContext<'_>, position: &kairos_execution::Position) {
        tracing::info!(
            instrument = %position.instrument_id,
            qty = %position.signed_qty,
            avg_px = %position.avg_entry_price,
            "position opened"
        );
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut engine = BacktestEngine::new();

    let mut account = Account::new(AccountType::Cash, Some(Currency::usd()));
    account.set_balance(AccountBalance::new(Currency::usd(), dec!(11_000), dec!(0)));
    engine.add_venue(Venue::new("SIM"), OmsType::Netting, account, Currency::usd());

    engine.add_instrument(kairos_instrument::Instrument::equity(
        InstrumentId::new("AAPL", "SIM"),
        Currency::usd(),
        InstrumentSpec::simple(2, 0).with_taker_fee(dec!(0.001)),
    ));

    engine.add_bar(Bar {
        bar_type: BarType {
            instrument_id: InstrumentId::new("AAPL", "SIM"),
            spec: BarSpec::new(1, BarAggregation::Day, PriceType::Trade),
        },
        open: Price::new(dec!(100.00), 2),
        high: Price::new(dec!(101.00), 2),
        low: Price::new(dec!(99.00), 2),
        close: Price::new(dec!(100.50), 2),
        volume: Quantity::new(dec!(1000), 0).unwrap(),
        ts_event: 1,
        ts_init: 1,
    });

    engine.add_strategy(Box::new(BuyAndHold {
        id: StrategyId::new("buy-and-hold"),
    }));

    engine.run(None, None);
    let result = engine.get_result().expect("run() always stores a result");

    println!("starting balance: {}", result.starting_balance);
    println!("ending balance:   {}", result.ending_balance);
    println!("total return:     {}", result.total_return);
    println!("total fills:      {}", result.total_fills);
    println!("open positions:   {}", result.total_positions);
}
