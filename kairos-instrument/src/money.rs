use crate::{currency::Currency, error::InstrumentError};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An exact-decimal monetary amount tagged with its [`Currency`].
///
/// Arithmetic between two [`Money`] values fails with
/// [`InstrumentError::CurrencyMismatch`] when the currencies differ - there is no implicit
/// conversion (`spec.md` §1 Non-goals: "currency conversion across balances").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Display)]
#[display("{amount} {currency}")]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    fn check_same_currency(&self, other: &Self) -> Result<(), InstrumentError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(InstrumentError::CurrencyMismatch {
                lhs: self.currency.code.to_string(),
                rhs: other.currency.code.to_string(),
            })
        }
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, InstrumentError> {
        self.check_same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self, InstrumentError> {
        self.check_same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency.clone()))
    }
}
