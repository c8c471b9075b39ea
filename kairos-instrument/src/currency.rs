use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Whether a [`Currency`] is a fiat currency or a crypto asset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum CurrencyKind {
    Fiat,
    Crypto,
}

/// An immutable currency definition: code, decimal precision, and fiat/crypto kind.
///
/// Equality is by `code` alone (two [`Currency`] values with the same code are the same
/// currency regardless of where they were constructed), matching how `barter_instrument`
/// treats assets as interned by name.
#[derive(Debug, Clone, Eq, Deserialize, Serialize, Display)]
#[display("{code}")]
pub struct Currency {
    pub code: SmolStr,
    pub precision: u8,
    pub kind: CurrencyKind,
}

impl Currency {
    /// Construct a new [`Currency`].
    pub fn new<S>(code: S, precision: u8, kind: CurrencyKind) -> Self
    where
        S: Into<SmolStr>,
    {
        Self {
            code: code.into(),
            precision,
            kind,
        }
    }

    /// Construct a fiat [`Currency`] with the conventional 2dp precision.
    pub fn fiat<S>(code: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self::new(code, 2, CurrencyKind::Fiat)
    }

    /// Construct a crypto [`Currency`] with the provided precision.
    pub fn crypto<S>(code: S, precision: u8) -> Self
    where
        S: Into<SmolStr>,
    {
        Self::new(code, precision, CurrencyKind::Crypto)
    }

    pub fn usd() -> Self {
        Self::fiat("USD")
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl std::hash::Hash for Currency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currencies_with_same_code_but_different_precision_are_equal() {
        let a = Currency::new("USD", 2, CurrencyKind::Fiat);
        let b = Currency::new("USD", 8, CurrencyKind::Crypto);
        assert_eq!(a, b);
    }

    #[test]
    fn currencies_with_different_codes_are_not_equal() {
        assert_ne!(Currency::usd(), Currency::fiat("EUR"));
    }
}
