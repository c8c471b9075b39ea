#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Kairos-Execution
//! The order FSM, position accounting and account model that sit between a strategy's
//! intentions and the simulated exchange's fills.
//!
//! Depends only on [`kairos_instrument`]; the matching/risk/orchestration layers in the `kairos`
//! crate depend on this one.

/// [`ExecutionError`], this crate's error type.
pub mod error;

/// Event-sourced [`order::Order`] and its FSM.
pub mod order;

/// [`position::Position`] accounting: weighted-average entry, realized PnL, flips.
pub mod position;

/// [`account::Account`]: per-currency balances and commission bookkeeping.
pub mod account;

pub use account::Account;
pub use error::ExecutionError;
pub use order::{Order, OrderEvent, OrderKind, OrderStatus, TimeInForce};
pub use position::{Position, PositionFill, PositionSide};
