use crate::currency::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An account's balance in a single [`Currency`]: `total`, `locked`, and the derived `free`.
///
/// `free` is always recomputed from `total - locked` by the constructor/mutators - callers
/// never hand-patch it, preserving the `free = total - locked` invariant from `spec.md` §3/§8.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccountBalance {
    pub currency: Currency,
    pub total: Decimal,
    pub locked: Decimal,
    pub free: Decimal,
}

impl AccountBalance {
    /// Construct a new [`AccountBalance`], deriving `free` from `total - locked`.
    pub fn new(currency: Currency, total: Decimal, locked: Decimal) -> Self {
        Self {
            currency,
            total,
            locked,
            free: total - locked,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(currency, Decimal::ZERO, Decimal::ZERO)
    }

    /// Apply a signed delta to `total`, re-deriving `free`.
    pub fn apply_total_delta(&mut self, delta: Decimal) {
        self.total += delta;
        self.free = self.total - self.locked;
    }

    /// Replace `locked`, re-deriving `free`.
    pub fn set_locked(&mut self, locked: Decimal) {
        self.locked = locked;
        self.free = self.total - self.locked;
    }
}
