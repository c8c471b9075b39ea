use crate::{
    currency::Currency, error::InstrumentError, identifier::InstrumentId, price::Price,
    quantity::Quantity,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The specific contract shape of an [`Instrument`], carrying only the fields that vary by
/// kind - everything else lives in [`InstrumentSpec`], shared across all kinds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum InstrumentKind {
    Equity,
    CurrencyPair,
    CryptoPerpetual {
        settlement_currency: Currency,
    },
    FuturesContract {
        settlement_currency: Currency,
        expiry_ts: i64,
    },
    OptionsContract {
        settlement_currency: Currency,
        expiry_ts: i64,
        strike: Decimal,
        is_call: bool,
    },
}

/// Fields shared by every [`InstrumentKind`]: precisions, increments, fee schedule and
/// quantity/price bounds (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InstrumentSpec {
    pub price_precision: u8,
    pub size_precision: u8,
    pub price_increment: Decimal,
    pub size_increment: Decimal,
    pub multiplier: Decimal,
    pub lot_size: Decimal,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub min_quantity: Decimal,
    pub max_quantity: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl InstrumentSpec {
    /// Construct a new [`InstrumentSpec`] with zero fees and no quantity/price bounds - the
    /// common case for tests and simple equities.
    pub fn simple(price_precision: u8, size_precision: u8) -> Self {
        Self {
            price_precision,
            size_precision,
            price_increment: Decimal::new(1, price_precision as u32),
            size_increment: Decimal::new(1, size_precision as u32),
            multiplier: Decimal::ONE,
            lot_size: Decimal::ONE,
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            min_quantity: Decimal::ZERO,
            max_quantity: None,
            min_price: None,
            max_price: None,
        }
    }

    pub fn with_taker_fee(mut self, taker_fee: Decimal) -> Self {
        self.taker_fee = taker_fee;
        self
    }

    pub fn with_maker_fee(mut self, maker_fee: Decimal) -> Self {
        self.maker_fee = maker_fee;
        self
    }

    pub fn with_quantity_bounds(mut self, min: Decimal, max: Option<Decimal>) -> Self {
        self.min_quantity = min;
        self.max_quantity = max;
        self
    }

    pub fn with_price_bounds(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }
}

/// A tradable instrument: identity, quote currency, kind-specific contract fields, and the
/// shared [`InstrumentSpec`].
///
/// Invariant: every [`Price`]/[`Quantity`] constructed for this instrument must match its
/// `price_precision`/`size_precision` - see [`Instrument::check_price`] and
/// [`Instrument::check_quantity`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub quote_currency: Currency,
    pub kind: InstrumentKind,
    pub spec: InstrumentSpec,
}

impl Instrument {
    pub fn new(
        id: InstrumentId,
        quote_currency: Currency,
        kind: InstrumentKind,
        spec: InstrumentSpec,
    ) -> Self {
        Self {
            id,
            quote_currency,
            kind,
            spec,
        }
    }

    pub fn equity(id: InstrumentId, quote_currency: Currency, spec: InstrumentSpec) -> Self {
        Self::new(id, quote_currency, InstrumentKind::Equity, spec)
    }

    pub fn currency_pair(id: InstrumentId, quote_currency: Currency, spec: InstrumentSpec) -> Self {
        Self::new(id, quote_currency, InstrumentKind::CurrencyPair, spec)
    }

    pub fn crypto_perpetual(
        id: InstrumentId,
        quote_currency: Currency,
        settlement_currency: Currency,
        spec: InstrumentSpec,
    ) -> Self {
        Self::new(
            id,
            quote_currency,
            InstrumentKind::CryptoPerpetual { settlement_currency },
            spec,
        )
    }

    pub fn futures_contract(
        id: InstrumentId,
        quote_currency: Currency,
        settlement_currency: Currency,
        expiry_ts: i64,
        spec: InstrumentSpec,
    ) -> Self {
        Self::new(
            id,
            quote_currency,
            InstrumentKind::FuturesContract {
                settlement_currency,
                expiry_ts,
            },
            spec,
        )
    }

    pub fn options_contract(
        id: InstrumentId,
        quote_currency: Currency,
        settlement_currency: Currency,
        expiry_ts: i64,
        strike: Decimal,
        is_call: bool,
        spec: InstrumentSpec,
    ) -> Self {
        Self::new(
            id,
            quote_currency,
            InstrumentKind::OptionsContract {
                settlement_currency,
                expiry_ts,
                strike,
                is_call,
            },
            spec,
        )
    }

    /// Check that `price`'s precision matches this instrument's `price_precision`, and that it
    /// falls within `min_price`/`max_price` if configured.
    pub fn check_price(&self, price: &Price) -> Result<(), InstrumentError> {
        price.check_precision(self.spec.price_precision)?;

        if let Some(min_price) = self.spec.min_price {
            if price.value() < min_price {
                return Err(InstrumentError::NonPositivePrice(price.value()));
            }
        }
        if let Some(max_price) = self.spec.max_price {
            if price.value() > max_price {
                return Err(InstrumentError::NonPositivePrice(price.value()));
            }
        }

        Ok(())
    }

    /// Check that `quantity`'s precision matches this instrument's `size_precision`, and that
    /// it falls within `min_quantity`/`max_quantity`.
    pub fn check_quantity(&self, quantity: &Quantity) -> Result<(), InstrumentError> {
        quantity.check_precision(self.spec.size_precision)?;

        if quantity.value() < self.spec.min_quantity {
            return Err(InstrumentError::NegativeQuantity(quantity.value()));
        }
        if let Some(max_quantity) = self.spec.max_quantity {
            if quantity.value() > max_quantity {
                return Err(InstrumentError::NegativeQuantity(quantity.value()));
            }
        }

        Ok(())
    }
}
