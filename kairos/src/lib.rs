#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Kairos
//! The deterministic, single-threaded backtesting kernel: message bus, clock, cache, data
//! engine, matching engine, simulated exchange, execution engine, strategy adapter, portfolio
//! query surface, statistics and the [`backtest::BacktestEngine`] driver that wires them
//! together.
//!
//! Depends on [`kairos_instrument`], [`kairos_execution`] and [`kairos_risk`]; nothing else in
//! the workspace depends on this crate.

/// This crate's error type, covering failures that cross engine boundaries.
pub mod error;

/// The synchronous pub/sub [`bus::MessageBus`] every engine publishes through.
pub mod bus;

/// [`clock::TestClock`]/[`clock::LiveClock`]: the kernel's only time sources.
pub mod clock;

/// [`cache::Cache`]: the kernel's in-memory entity store.
pub mod cache;

/// [`data_engine::DataEngine`]: routes market data into the cache and onto the bus.
pub mod data_engine;

/// [`matching_engine::MatchingEngine`]: the bar-driven fill-check policy table.
pub mod matching_engine;

/// [`simulated_exchange::SimulatedExchange`]: per-venue account and matching engines.
pub mod simulated_exchange;

/// [`execution_engine::ExecutionEngine`]: the risk-gate-to-fill order/position hub.
pub mod execution_engine;

/// [`strategy::Strategy`] and [`strategy::StrategyContext`]: the strategy adapter layer.
pub mod strategy;

/// [`portfolio::Portfolio`]: a read-only query surface over open/closed positions.
pub mod portfolio;

/// Performance statistics computed from a backtest's balance curve and closed positions.
pub mod statistic;

/// [`backtest::BacktestEngine`] and [`backtest::BacktestResult`]: the top-level driver.
pub mod backtest;

pub use backtest::{BacktestEngine, BacktestResult, DataRecord};
pub use bus::{Message, MessageBus};
pub use cache::Cache;
pub use clock::{Clock, LiveClock, TestClock, TimeEvent};
pub use data_engine::DataEngine;
pub use error::KairosError;
pub use execution_engine::ExecutionEngine;
pub use matching_engine::{MatchedFill, MatchingEngine};
pub use portfolio::Portfolio;
pub use simulated_exchange::SimulatedExchange;
pub use strategy::{Indicator, OrderFactory, Strategy, StrategyContext, Subscriptions};
