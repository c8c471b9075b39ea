#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Kairos-Instrument
//! Core value types, identifiers, market data records and instrument model shared by every
//! other crate in the Kairos backtesting kernel.
//!
//! Nothing in this crate depends on the simulation kernel itself - it is the leaf of the
//! dependency graph (see the workspace `DESIGN.md`).

/// Error types shared across this crate's value types and instrument model.
pub mod error;

/// Nominal identifier types (`Symbol`, `Venue`, `InstrumentId`, `StrategyId`, ...).
///
/// Each identifier is its own distinct type so that two identifiers of different kinds with
/// equal inner strings are never equal and never hash the same.
pub mod identifier;

/// [`Currency`](currency::Currency) and the fiat/crypto distinction.
pub mod currency;

/// Exact-decimal [`Price`](price::Price) value type.
pub mod price;

/// Exact-decimal [`Quantity`](quantity::Quantity) value type.
pub mod quantity;

/// [`Money`](money::Money): a [`Decimal`](rust_decimal::Decimal) amount tagged with a
/// [`Currency`](currency::Currency).
pub mod money;

/// [`AccountBalance`](balance::AccountBalance): total/locked/free balance bookkeeping.
pub mod balance;

/// Bar (OHLCV) market data and the `BarType`/`BarSpec` key used to subscribe to it.
pub mod bar;

/// Quote tick market data.
pub mod quote;

/// Trade tick market data.
pub mod trade_tick;

/// [`Instrument`](instrument::Instrument) variants and shared specification fields.
pub mod instrument;

/// Small shared enums: [`Side`](enums::Side), [`OmsType`](enums::OmsType),
/// [`AccountType`](enums::AccountType), [`TradingState`](enums::TradingState).
pub mod enums;

pub use balance::AccountBalance;
pub use bar::{Bar, BarAggregation, BarSpec, BarType, PriceType};
pub use currency::Currency;
pub use enums::{AccountType, OmsType, Side, TradingState};
pub use error::InstrumentError;
pub use identifier::{
    ClientOrderId, InstrumentId, PositionId, StrategyId, Symbol, TradeId, Venue, VenueOrderId,
};
pub use instrument::Instrument;
pub use money::Money;
pub use price::Price;
pub use quantity::Quantity;
pub use quote::QuoteTick;
pub use trade_tick::{MarketTradeId, TradeTick};
