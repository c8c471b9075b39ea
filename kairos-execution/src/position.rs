use crate::error::ExecutionError;
use kairos_instrument::{
    Currency, InstrumentId, Money, Price, PositionId, Quantity, Side, StrategyId, TradeId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The side of a [`Position`], derived from the sign of `signed_qty` (`spec.md` §3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

impl PositionSide {
    pub fn from_signed_qty(signed_qty: Decimal) -> Self {
        if signed_qty.is_zero() {
            PositionSide::Flat
        } else if signed_qty.is_sign_positive() {
            PositionSide::Long
        } else {
            PositionSide::Short
        }
    }
}

/// A single fill being applied to a [`Position`].
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFill {
    pub trade_id: TradeId,
    pub side: Side,
    pub last_qty: Quantity,
    pub last_px: Price,
    pub commission: Money,
    pub ts_event: i64,
}

/// An open (or closed-but-retained) trading position.
///
/// `apply` implements the weighted-average-entry / realized-PnL / flip algorithm of `spec.md`
/// §4.9 (cases A/B/C). Closed positions are terminated, not destroyed: `ts_closed` is set and
/// further fills are rejected (`spec.md` §4.9 / §8).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub id: PositionId,
    pub instrument_id: InstrumentId,
    pub strategy_id: StrategyId,
    pub signed_qty: Decimal,
    pub avg_entry_price: Decimal,
    pub realized_pnl: BTreeMap<String, Decimal>,
    pub commissions: BTreeMap<String, Decimal>,
    pub ts_opened: i64,
    pub ts_closed: Option<i64>,
    pub events: Vec<TradeId>,
}

impl Position {
    /// Open a new [`Position`] from its first fill.
    pub fn open(id: PositionId, instrument_id: InstrumentId, strategy_id: StrategyId, fill: &PositionFill) -> Self {
        let dq = Decimal::from(fill.side.signum()) * fill.last_qty.value();

        let mut position = Self {
            id,
            instrument_id,
            strategy_id,
            signed_qty: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            realized_pnl: BTreeMap::new(),
            commissions: BTreeMap::new(),
            ts_opened: fill.ts_event,
            ts_closed: None,
            events: Vec::new(),
        };

        position.signed_qty = dq;
        position.avg_entry_price = fill.last_px.value();
        position.record_commission(fill);
        position.events.push(fill.trade_id.clone());

        position
    }

    pub fn side(&self) -> PositionSide {
        PositionSide::from_signed_qty(self.signed_qty)
    }

    pub fn quantity(&self) -> Decimal {
        self.signed_qty.abs()
    }

    pub fn is_closed(&self) -> bool {
        self.ts_closed.is_some()
    }

    /// Apply `fill` to this position, implementing `spec.md` §4.9 cases A (add), B (reduce)
    /// and C (flip). Returns a newly-opened [`Position`] when a flip produces leftover
    /// quantity in the opposite direction.
    ///
    /// # Errors
    /// Returns [`ExecutionError::InvariantViolation`] if the position is already closed.
    pub fn apply(&mut self, fill: &PositionFill) -> Result<Option<Position>, ExecutionError> {
        if self.is_closed() {
            return Err(ExecutionError::InvariantViolation(format!(
                "position {:?} received a fill after close",
                self.id
            )));
        }

        let dq = Decimal::from(fill.side.signum()) * fill.last_qty.value();
        let old_signed = self.signed_qty;

        self.record_commission(fill);
        self.events.push(fill.trade_id.clone());

        let same_direction_or_opening = old_signed == Decimal::ZERO || old_signed.signum() == dq.signum();

        if same_direction_or_opening {
            // Case A: weighted-average the entry price.
            let old_abs = old_signed.abs();
            self.avg_entry_price = if old_abs.is_zero() {
                fill.last_px.value()
            } else {
                (old_abs * self.avg_entry_price + fill.last_qty.value() * fill.last_px.value())
                    / (old_abs + fill.last_qty.value())
            };
            self.signed_qty += dq;
            return Ok(None);
        }

        if dq.abs() <= old_signed.abs() {
            // Case B: reduce without flip.
            self.realize(fill.last_qty.value(), fill.last_px.value(), fill.commission.currency.code.as_str());
            self.signed_qty += dq;

            if self.signed_qty.is_zero() {
                self.ts_closed = Some(fill.ts_event);
            }
            return Ok(None);
        }

        // Case C: flip. Close the existing leg, then open a new leg with the remainder.
        let close_qty = old_signed.abs();
        let open_qty = dq.abs() - close_qty;

        self.realize(close_qty, fill.last_px.value(), fill.commission.currency.code.as_str());
        self.signed_qty = Decimal::ZERO;
        self.ts_closed = Some(fill.ts_event);

        let new_side = if dq.is_sign_positive() { Side::Buy } else { Side::Sell };
        let new_leg_fill = PositionFill {
            trade_id: fill.trade_id.clone(),
            side: new_side,
            last_qty: Quantity::new(open_qty, fill.last_qty.precision()).map_err(ExecutionError::from)?,
            last_px: fill.last_px,
            commission: Money::zero(fill.commission.currency.clone()),
            ts_event: fill.ts_event,
        };

        let new_leg = Position::open(
            PositionId::new(format!("{}-flip", self.id.as_str())),
            self.instrument_id.clone(),
            self.strategy_id.clone(),
            &new_leg_fill,
        );

        Ok(Some(new_leg))
    }

    /// Realize PnL on a closing slice of `qty` at `px`, per the LONG/SHORT formula in
    /// `spec.md` §4.9. Keyed by `currency_code` (`spec.md` §3: "`realized_pnl` (per currency)"),
    /// matching [`Self::record_commission`]'s per-currency keying below.
    fn realize(&mut self, qty: Decimal, px: Decimal, currency_code: &str) {
        let delta = match self.side() {
            PositionSide::Long => qty * (px - self.avg_entry_price),
            PositionSide::Short => qty * (self.avg_entry_price - px),
            PositionSide::Flat => Decimal::ZERO,
        };

        *self.realized_pnl.entry(currency_code.to_string()).or_default() += delta;
    }

    fn record_commission(&mut self, fill: &PositionFill) {
        *self
            .commissions
            .entry(fill.commission.currency.code.to_string())
            .or_default() += fill.commission.amount;
    }

    /// Unrealized PnL against `last_px`, computed on the current signed quantity and average
    /// entry price (`spec.md` §4.9).
    pub fn unrealized_pnl(&self, last_px: Decimal) -> Decimal {
        match self.side() {
            PositionSide::Long => self.signed_qty * (last_px - self.avg_entry_price),
            PositionSide::Short => self.signed_qty.abs() * (self.avg_entry_price - last_px),
            PositionSide::Flat => Decimal::ZERO,
        }
    }

    /// Total realized PnL across all tracked currencies (the kernel only ever uses one, the
    /// instrument's quote currency, per `spec.md` §1 Non-goals).
    pub fn total_realized_pnl(&self) -> Decimal {
        self.realized_pnl.values().sum()
    }
}
