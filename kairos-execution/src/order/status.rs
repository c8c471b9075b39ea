use serde::{Deserialize, Serialize};

/// An order's lifecycle state. See the transition table in `spec.md` §3/§4.8.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum OrderStatus {
    Initialized,
    Denied,
    Submitted,
    Accepted,
    Rejected,
    Canceled,
    Expired,
    Triggered,
    PartiallyFilled,
    Filled,
    PendingUpdate,
    PendingCancel,
}

impl OrderStatus {
    /// The set of statuses reachable from `self` in a single event application.
    ///
    /// A terminal status (`spec.md`'s glossary) has an empty successor set.
    pub fn allowed_successors(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;

        match self {
            Initialized => &[Denied, Submitted],
            Submitted => &[Accepted, Rejected, Canceled],
            Accepted => &[
                Canceled,
                Expired,
                Triggered,
                PendingUpdate,
                PendingCancel,
                PartiallyFilled,
                Filled,
            ],
            Triggered => &[Canceled, Expired, PartiallyFilled, Filled],
            PartiallyFilled => &[Canceled, PartiallyFilled, Filled],
            PendingUpdate => &[Accepted, Canceled],
            PendingCancel => &[Accepted, Canceled],
            Denied | Rejected | Canceled | Expired | Filled => &[],
        }
    }

    /// Whether this status has no allowed successors.
    pub fn is_terminal(&self) -> bool {
        self.allowed_successors().is_empty()
    }

    /// Whether `next` is a legal single-step transition from `self`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_successors().contains(&next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn terminal_states_have_no_successors() {
        for terminal in [Denied, Rejected, Canceled, Expired, Filled] {
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn initialized_can_only_reach_denied_or_submitted() {
        assert!(Initialized.can_transition_to(Denied));
        assert!(Initialized.can_transition_to(Submitted));
        assert!(!Initialized.can_transition_to(Accepted));
        assert!(!Initialized.can_transition_to(Filled));
    }

    #[test]
    fn accepted_cannot_reach_submitted_or_rejected() {
        assert!(!Accepted.can_transition_to(Submitted));
        assert!(!Accepted.can_transition_to(Rejected));
        assert!(Accepted.can_transition_to(PartiallyFilled));
        assert!(Accepted.can_transition_to(Filled));
    }

    #[test]
    fn pending_states_can_only_reach_accepted_or_canceled() {
        for pending in [PendingUpdate, PendingCancel] {
            assert!(pending.can_transition_to(Accepted));
            assert!(pending.can_transition_to(Canceled));
            assert!(!pending.can_transition_to(Filled));
        }
    }
}
