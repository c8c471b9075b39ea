use crate::error::RiskDenyReason;
use kairos_execution::{Order, OrderKind};
use kairos_instrument::{Instrument, InstrumentId, StrategyId, TradingState};
use rust_decimal::Decimal;

/// Everything the risk engine needs to look up about the outside world to evaluate an order.
///
/// Implemented by the kernel's cache in the `kairos` crate; kept as a trait here so this crate
/// stays a leaf with no dependency on the orchestration layer (`spec.md` §9: "engines hold
/// references by identifier and look up through the cache").
pub trait RiskDataProvider {
    fn trading_state(&self) -> TradingState;
    fn instrument(&self, instrument_id: &InstrumentId) -> Option<&Instrument>;
    /// The current signed net position quantity for `(instrument_id, strategy_id)`, or zero if
    /// flat / no position exists.
    fn net_position_qty(&self, instrument_id: &InstrumentId, strategy_id: &StrategyId) -> Decimal;
}

/// A stateless pre-trade validator (`spec.md` §4.6). Checks run in a fixed order and the first
/// failure is returned - later checks never mask an earlier one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `order` against `provider`, returning the first [`RiskDenyReason`] encountered,
    /// or `Ok(())` if the order passes every check.
    pub fn check_order(
        &self,
        order: &Order,
        provider: &impl RiskDataProvider,
    ) -> Result<(), RiskDenyReason> {
        self.check_trading_state(order, provider)?;

        let instrument = provider
            .instrument(&order.instrument_id)
            .ok_or_else(|| RiskDenyReason::UnknownInstrument(order.instrument_id.clone()))?;

        self.check_quantity(order, instrument)?;
        self.check_price(order, instrument)?;

        Ok(())
    }

    fn check_trading_state(
        &self,
        order: &Order,
        provider: &impl RiskDataProvider,
    ) -> Result<(), RiskDenyReason> {
        match provider.trading_state() {
            TradingState::Halted => Err(RiskDenyReason::Halted),
            TradingState::Reducing => {
                let current = provider.net_position_qty(&order.instrument_id, &order.strategy_id);
                let dq = Decimal::from(order.side.signum()) * order.quantity.value();

                let increases_abs_position = current.is_zero() || current.signum() == dq.signum();
                if increases_abs_position {
                    Err(RiskDenyReason::Reducing)
                } else {
                    Ok(())
                }
            }
            TradingState::Active => Ok(()),
        }
    }

    fn check_quantity(&self, order: &Order, instrument: &Instrument) -> Result<(), RiskDenyReason> {
        let quantity = order.quantity;

        if quantity.precision() != instrument.spec.size_precision {
            return Err(RiskDenyReason::QuantityPrecision {
                expected: instrument.spec.size_precision,
                actual: quantity.precision(),
            });
        }

        let within_min = quantity.value() >= instrument.spec.min_quantity;
        let within_max = instrument
            .spec
            .max_quantity
            .is_none_or(|max| quantity.value() <= max);

        if !within_min || !within_max {
            return Err(RiskDenyReason::QuantityBounds {
                quantity: quantity.value(),
                min: instrument.spec.min_quantity,
                max: instrument.spec.max_quantity,
            });
        }

        Ok(())
    }

    fn check_price(&self, order: &Order, instrument: &Instrument) -> Result<(), RiskDenyReason> {
        let prices = match order.kind {
            OrderKind::Market => return Ok(()),
            OrderKind::Limit { price } => vec![price],
            OrderKind::StopMarket { trigger_price } => vec![trigger_price],
            OrderKind::StopLimit { trigger_price, price } => vec![trigger_price, price],
        };

        for price in prices {
            if price.value() <= Decimal::ZERO {
                return Err(RiskDenyReason::NonPositivePrice(price.value()));
            }
            if price.precision() != instrument.spec.price_precision {
                return Err(RiskDenyReason::PricePrecision {
                    expected: instrument.spec.price_precision,
                    actual: price.precision(),
                });
            }

            let within_min = instrument.spec.min_price.is_none_or(|min| price.value() >= min);
            let within_max = instrument.spec.max_price.is_none_or(|max| price.value() <= max);

            if !within_min || !within_max {
                return Err(RiskDenyReason::PriceBounds {
                    price: price.value(),
                    min: instrument.spec.min_price,
                    max: instrument.spec.max_price,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_execution::{OrderKind, TimeInForce};
    use kairos_instrument::{ClientOrderId, Currency, InstrumentSpec, Quantity, Side};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct FakeProvider {
        trading_state: TradingState,
        instruments: HashMap<InstrumentId, Instrument>,
        net_positions: HashMap<(InstrumentId, StrategyId), Decimal>,
    }

    impl RiskDataProvider for FakeProvider {
        fn trading_state(&self) -> TradingState {
            self.trading_state
        }

        fn instrument(&self, instrument_id: &InstrumentId) -> Option<&Instrument> {
            self.instruments.get(instrument_id)
        }

        fn net_position_qty(&self, instrument_id: &InstrumentId, strategy_id: &StrategyId) -> Decimal {
            self.net_positions
                .get(&(instrument_id.clone(), strategy_id.clone()))
                .copied()
                .unwrap_or_default()
        }
    }

    fn aapl() -> Instrument {
        Instrument::equity(
            InstrumentId::new("AAPL", "SIM"),
            Currency::usd(),
            InstrumentSpec::simple(2, 0).with_quantity_bounds(dec!(1), Some(dec!(100_000))),
        )
    }

    fn provider(trading_state: TradingState, net_position: Decimal) -> FakeProvider {
        let instrument = aapl();
        let mut instruments = HashMap::new();
        let mut net_positions = HashMap::new();
        net_positions.insert((instrument.id.clone(), StrategyId::new("s1")), net_position);
        instruments.insert(instrument.id.clone(), instrument);

        FakeProvider {
            trading_state,
            instruments,
            net_positions,
        }
    }

    fn order(side: Side, qty: Decimal) -> Order {
        Order::new(
            ClientOrderId::new("O-1"),
            InstrumentId::new("AAPL", "SIM"),
            StrategyId::new("s1"),
            side,
            OrderKind::Market,
            Quantity::new(qty, 0).unwrap(),
            TimeInForce::GoodTillCancel,
        )
    }

    #[test]
    fn halted_denies_everything() {
        let provider = provider(TradingState::Halted, Decimal::ZERO);
        let result = RiskEngine::new().check_order(&order(Side::Buy, dec!(1)), &provider);
        assert_eq!(result, Err(RiskDenyReason::Halted));
    }

    #[test]
    fn reducing_denies_buy_that_increases_long_position_but_allows_offsetting_sell() {
        let provider = provider(TradingState::Reducing, dec!(10));

        let buy = order(Side::Buy, dec!(1));
        assert_eq!(
            RiskEngine::new().check_order(&buy, &provider),
            Err(RiskDenyReason::Reducing)
        );

        let sell = order(Side::Sell, dec!(1));
        assert!(RiskEngine::new().check_order(&sell, &provider).is_ok());
    }

    #[test]
    fn unknown_instrument_is_denied() {
        let provider = provider(TradingState::Active, Decimal::ZERO);
        let mut unknown = order(Side::Buy, dec!(1));
        unknown.instrument_id = InstrumentId::new("MSFT", "SIM");

        let result = RiskEngine::new().check_order(&unknown, &provider);
        assert!(matches!(result, Err(RiskDenyReason::UnknownInstrument(_))));
    }

    #[test]
    fn quantity_outside_bounds_is_denied() {
        let provider = provider(TradingState::Active, Decimal::ZERO);
        let too_small = order(Side::Buy, dec!(0));
        assert!(matches!(
            RiskEngine::new().check_order(&too_small, &provider),
            Err(RiskDenyReason::QuantityBounds { .. })
        ));
    }

    #[test]
    fn limit_price_precision_mismatch_is_denied() {
        let provider = provider(TradingState::Active, Decimal::ZERO);
        let mut limit = order(Side::Buy, dec!(1));
        limit.kind = OrderKind::Limit {
            price: kairos_instrument::Price::new(dec!(100.123), 3),
        };

        let result = RiskEngine::new().check_order(&limit, &provider);
        assert!(matches!(result, Err(RiskDenyReason::PricePrecision { .. })));
    }
}
