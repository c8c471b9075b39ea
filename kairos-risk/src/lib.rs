#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Kairos-Risk
//! The pre-trade risk gate: a stateless validator that runs a fixed, ordered set of checks
//! against an [`Order`](kairos_execution::Order) before it is allowed to reach a venue.

/// [`RiskDenyReason`], the sole soft-fail channel in the kernel.
pub mod error;

/// [`RiskEngine`] and the [`RiskDataProvider`](engine::RiskDataProvider) lookup trait it runs
/// against.
pub mod engine;

pub use engine::{RiskDataProvider, RiskEngine};
pub use error::RiskDenyReason;
