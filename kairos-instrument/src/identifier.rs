use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;

/// Generates a `SmolStr`-backed nominal identifier newtype.
///
/// Each generated type is its own distinct type - two identifiers of different kinds that
/// happen to wrap the same string are never `==` and never hash to the same bucket, since
/// equality and hashing are scoped to the wrapping type by the compiler, not by a runtime
/// "kind" tag.
macro_rules! smol_str_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
        pub struct $name(pub SmolStr);

        impl $name {
            /// Construct a new identifier from any `Into<SmolStr>` source.
            pub fn new<S>(value: S) -> Self
            where
                S: Into<SmolStr>,
            {
                Self(value.into())
            }

            /// Borrow the identifier's inner string.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.borrow()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_ref()
            }
        }
    };
}

smol_str_id!(
    /// Exchange-agnostic symbol, eg/ `"AAPL"`, `"BTC-USDT"`.
    Symbol
);

smol_str_id!(
    /// Identifies a simulated venue, eg/ `"SIM"`, `"NASDAQ"`.
    Venue
);

smol_str_id!(
    /// Client-assigned order id, of the form `O-{strategy_id}-{n}` when issued by the
    /// strategy adapter's order factory.
    ClientOrderId
);

smol_str_id!(
    /// Venue-assigned order id, allocated by a venue's monotonically increasing counter.
    VenueOrderId
);

smol_str_id!(
    /// Identifies the strategy instance that originated an order or position.
    StrategyId
);

smol_str_id!(
    /// Identifies a [`Position`](crate::Instrument) instance - unique within a strategy's
    /// `HEDGING` book, otherwise derivable from `(instrument_id, strategy_id)` under `NETTING`.
    PositionId
);

smol_str_id!(
    /// Identifies a fill, allocated by a venue's monotonically increasing trade counter.
    TradeId
);

/// Unique identifier for an [`Instrument`](crate::Instrument), formed as `{symbol}.{venue}`.
///
/// The venue is always the substring after the final `.`; the symbol is everything before it.
/// This allows symbols to themselves contain dots (eg/ `"BRK.B"`).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[display("{}.{}", symbol, venue)]
pub struct InstrumentId {
    pub symbol: Symbol,
    pub venue: Venue,
}

impl InstrumentId {
    /// Construct a new [`InstrumentId`] from a symbol and venue.
    pub fn new<S, V>(symbol: S, venue: V) -> Self
    where
        S: Into<Symbol>,
        V: Into<Venue>,
    {
        Self {
            symbol: symbol.into(),
            venue: venue.into(),
        }
    }

    /// Parse `"{symbol}.{venue}"`, splitting on the final `.`.
    ///
    /// Returns `None` if there is no `.` in the input.
    pub fn from_string<S>(value: S) -> Option<Self>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref();
        let dot = value.rfind('.')?;
        let (symbol, venue) = value.split_at(dot);
        let venue = &venue[1..];

        if symbol.is_empty() || venue.is_empty() {
            return None;
        }

        Some(Self::new(symbol, venue))
    }
}
