use crate::statistic::{max_drawdown, ProfitFactor, SharpeRatio, WinRate};
use rust_decimal::Decimal;
use serde::Serialize;

/// The computed outcome of a backtest run (`spec.md` §6).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub start_ns: i64,
    pub end_ns: i64,
    pub total_orders: u64,
    pub total_positions: u64,
    pub total_fills: u64,
    pub starting_balance: Decimal,
    pub ending_balance: Decimal,
    pub total_return: Decimal,
    pub total_commissions: Decimal,
    pub max_drawdown: Decimal,
    pub sharpe_ratio: f64,
    pub win_rate: Option<Decimal>,
    pub profit_factor: Option<Decimal>,
    pub avg_win: Option<Decimal>,
    pub avg_loss: Option<Decimal>,
    pub balance_curve: Vec<(i64, Decimal)>,
}

/// Inputs the backtest driver has accumulated over a run, reduced here into a
/// [`BacktestResult`] (`spec.md` §6's computation formulas).
pub struct ResultInputs {
    pub start_ns: i64,
    pub end_ns: i64,
    pub total_orders: u64,
    pub total_positions: u64,
    pub total_fills: u64,
    pub starting_balance: Decimal,
    pub total_commissions: Decimal,
    pub closed_position_pnls: Vec<Decimal>,
    pub balance_curve: Vec<(i64, Decimal)>,
}

impl ResultInputs {
    pub fn build(self) -> BacktestResult {
        let ending_balance = self
            .balance_curve
            .last()
            .map(|(_, balance)| *balance)
            .unwrap_or(self.starting_balance);

        // spec.md §6: `total_return = ending − starting`, an absolute currency delta, not a
        // percentage - `ending_balance`/`starting_balance` already carry the scale.
        let total_return = ending_balance - self.starting_balance;

        let wins: Vec<Decimal> = self
            .closed_position_pnls
            .iter()
            .copied()
            .filter(|pnl| *pnl > Decimal::ZERO)
            .collect();
        let losses: Vec<Decimal> = self
            .closed_position_pnls
            .iter()
            .copied()
            .filter(|pnl| *pnl < Decimal::ZERO)
            .collect();

        let gross_wins: Decimal = wins.iter().sum();
        let gross_losses_abs: Decimal = losses.iter().map(|l| l.abs()).sum();
        let total_closed = Decimal::from(self.closed_position_pnls.len() as u64);

        let avg_win = (!wins.is_empty())
            .then(|| gross_wins / Decimal::from(wins.len() as u64));
        let avg_loss = (!losses.is_empty())
            .then(|| gross_losses_abs / Decimal::from(losses.len() as u64));

        let returns: Vec<f64> = self
            .balance_curve
            .windows(2)
            .filter_map(|pair| {
                let (_, prev) = pair[0];
                let (_, next) = pair[1];
                if prev.is_zero() {
                    None
                } else {
                    Some(((next - prev) / prev).to_string().parse::<f64>().unwrap_or(0.0))
                }
            })
            .collect();

        BacktestResult {
            start_ns: self.start_ns,
            end_ns: self.end_ns,
            total_orders: self.total_orders,
            total_positions: self.total_positions,
            total_fills: self.total_fills,
            starting_balance: self.starting_balance,
            ending_balance,
            total_return,
            total_commissions: self.total_commissions,
            max_drawdown: max_drawdown(&self.balance_curve),
            sharpe_ratio: SharpeRatio::from_returns(&returns).map(|s| s.value).unwrap_or(0.0),
            win_rate: WinRate::calculate(Decimal::from(wins.len() as u64), total_closed).map(|w| w.value),
            profit_factor: ProfitFactor::calculate(gross_wins, gross_losses_abs).map(|p| p.value),
            avg_win,
            avg_loss,
            balance_curve: self.balance_curve,
        }
    }
}
