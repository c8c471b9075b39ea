use indexmap::IndexMap;
use kairos_instrument::{AccountBalance, AccountType, Currency, Money};
use serde::{Deserialize, Serialize};

/// A simulated trading account: per-currency balances plus lifetime commission totals.
///
/// Balances are kept in an [`IndexMap`] rather than a [`std::collections::HashMap`] so that
/// iteration order (e.g. when producing a snapshot or report) matches insertion order and stays
/// deterministic across runs (`spec.md` §1: "bit-for-bit reproducible").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Account {
    pub account_type: AccountType,
    pub base_currency: Option<Currency>,
    balances: IndexMap<Currency, AccountBalance>,
    commissions: IndexMap<Currency, Money>,
}

impl Account {
    pub fn new(account_type: AccountType, base_currency: Option<Currency>) -> Self {
        Self {
            account_type,
            base_currency,
            balances: IndexMap::new(),
            commissions: IndexMap::new(),
        }
    }

    /// Seed a starting balance. Overwrites any existing balance for the same currency.
    pub fn set_balance(&mut self, balance: AccountBalance) {
        self.balances.insert(balance.currency.clone(), balance);
    }

    pub fn balance(&self, currency: &Currency) -> Option<&AccountBalance> {
        self.balances.get(currency)
    }

    pub fn balances(&self) -> impl Iterator<Item = &AccountBalance> {
        self.balances.values()
    }

    /// Apply a signed PnL/cash delta to the balance for `currency`, creating a zero balance
    /// first if none exists yet.
    pub fn apply_pnl(&mut self, currency: &Currency, delta: rust_decimal::Decimal) {
        self.balances
            .entry(currency.clone())
            .or_insert_with(|| AccountBalance::zero(currency.clone()))
            .apply_total_delta(delta);
    }

    /// Record a fill's commission against the account, deducting it from that currency's
    /// balance and accumulating the lifetime total (`spec.md` §4.9).
    pub fn apply_commission(&mut self, commission: &Money) {
        self.apply_pnl(&commission.currency, -commission.amount);

        self.commissions
            .entry(commission.currency.clone())
            .and_modify(|total| total.amount += commission.amount)
            .or_insert_with(|| commission.clone());
    }

    pub fn total_commission(&self, currency: &Currency) -> rust_decimal::Decimal {
        self.commissions
            .get(currency)
            .map(|m| m.amount)
            .unwrap_or_default()
    }
}
