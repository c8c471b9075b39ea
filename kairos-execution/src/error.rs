use kairos_instrument::{ClientOrderId, InstrumentError};
use thiserror::Error;

/// Errors raised by the order FSM, position accounting and account model.
///
/// [`ExecutionError::InvariantViolation`] is the kernel's `InvariantViolation` error kind
/// (`spec.md` §7): an illegal FSM transition, a fill applied to a closed position, or any
/// other state corruption. Callers at the kernel boundary treat it as fatal and abort the run.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("order {0} not found")]
    OrderNotFound(ClientOrderId),

    #[error("position {0:?} not found")]
    PositionNotFound(String),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}

impl ExecutionError {
    pub fn illegal_transition(order: &ClientOrderId, from: impl std::fmt::Debug, event: impl std::fmt::Debug) -> Self {
        Self::InvariantViolation(format!(
            "order {order} cannot apply {event:?} while in state {from:?}"
        ))
    }
}
