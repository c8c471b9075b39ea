//! Backtest result metrics (`spec.md` §6): each a standalone `calculate` function over plain
//! [`Decimal`](rust_decimal::Decimal)/`f64` inputs, grounded on the teacher's
//! `barter::statistic::metric` module but trimmed to the formulas `spec.md` §6 specifies
//! exactly rather than the teacher's generic time-interval-scaled versions.

pub mod drawdown;
pub mod profit_factor;
pub mod sharpe;
pub mod win_rate;

pub use drawdown::max_drawdown;
pub use profit_factor::ProfitFactor;
pub use sharpe::SharpeRatio;
pub use win_rate::WinRate;
