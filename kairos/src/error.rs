use kairos_execution::ExecutionError;
use kairos_instrument::InstrumentId;
use kairos_risk::RiskDenyReason;
use thiserror::Error;

/// The kernel's top-level error type (`spec.md` §7).
///
/// [`KairosError::RiskDenied`] is the sole soft-fail channel: it is converted into an
/// `OrderDenied` event delivered to the submitting strategy, never propagated to the driver.
/// Every other variant is fatal and aborts the run.
#[derive(Debug, Clone, Error)]
pub enum KairosError {
    #[error(transparent)]
    InvariantViolation(#[from] ExecutionError),

    #[error("order denied: {0}")]
    RiskDenied(#[from] RiskDenyReason),

    #[error("venue {0} not found")]
    UnknownVenue(String),

    #[error("instrument {0} not found in cache")]
    UnknownInstrument(InstrumentId),

    #[error("duplicate instrument registration: {0}")]
    DuplicateInstrument(InstrumentId),

    #[error("configuration error: {0}")]
    Configuration(String),
}
