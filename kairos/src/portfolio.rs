use crate::cache::Cache;
use kairos_execution::{Account, Position, PositionSide};
use kairos_instrument::{Currency, InstrumentId, StrategyId};
use rust_decimal::Decimal;

/// A read-only query surface over the [`Cache`]'s positions and an account's balances, used by
/// strategies and the backtest driver's reporting step (`spec.md` §4.10/§6).
///
/// Holds no state - every method borrows `cache`/`account` for the duration of the call,
/// matching this kernel's "engines don't own entity state, the cache does" design.
#[derive(Debug, Default)]
pub struct Portfolio;

impl Portfolio {
    pub fn new() -> Self {
        Self
    }

    /// The net signed quantity across every open position for `(instrument_id, strategy_id)`.
    pub fn net_position_qty(&self, cache: &Cache, instrument_id: &InstrumentId, strategy_id: &StrategyId) -> Decimal {
        cache
            .open_positions_for(instrument_id, strategy_id)
            .iter()
            .map(|position| position.signed_qty)
            .sum()
    }

    pub fn is_flat(&self, cache: &Cache, instrument_id: &InstrumentId, strategy_id: &StrategyId) -> bool {
        self.net_position_qty(cache, instrument_id, strategy_id).is_zero()
    }

    pub fn open_positions(&self, cache: &Cache, strategy_id: &StrategyId) -> Vec<&Position> {
        cache
            .positions_for_strategy(strategy_id)
            .into_iter()
            .filter(|position| !position.is_closed())
            .collect()
    }

    pub fn closed_positions(&self, cache: &Cache, strategy_id: &StrategyId) -> Vec<&Position> {
        cache
            .positions_for_strategy(strategy_id)
            .into_iter()
            .filter(|position| position.is_closed())
            .collect()
    }

    pub fn position_side(&self, cache: &Cache, instrument_id: &InstrumentId, strategy_id: &StrategyId) -> PositionSide {
        PositionSide::from_signed_qty(self.net_position_qty(cache, instrument_id, strategy_id))
    }

    /// The total value of `account`'s balance in `currency` (`spec.md` §6's `ending_balance`
    /// and balance-curve sampling - cash accounts only, no mark-to-market of open positions).
    pub fn account_value(&self, account: &Account, currency: &Currency) -> Decimal {
        account.balance(currency).map(|b| b.total).unwrap_or_default()
    }
}
