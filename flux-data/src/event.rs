use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Normalised exchange-independent event produced by a [`Parser`](crate::exchange::Parser)
/// from one raw frame.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub enum MarketEvent {
    Trade(PublicTrade),
    BookDelta(BookDelta),
    /// Snapshot carrying no levels: the book is empty but consistent.
    BookReset,
    Heartbeat,
    /// Frame that matched no known shape for the configured channel, kept verbatim.
    Unparsed(String),
}

impl MarketEvent {
    pub fn unparsed(frame: &str) -> Self {
        Self::Unparsed(frame.to_owned())
    }
}

/// Ordered collection of [`MarketEvent`]s parsed from a single frame.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct MarketIter(pub Vec<MarketEvent>);

impl MarketIter {
    pub fn unparsed(frame: &str) -> Self {
        Self(vec![MarketEvent::unparsed(frame)])
    }

    pub fn heartbeat() -> Self {
        Self(vec![MarketEvent::Heartbeat])
    }
}

impl FromIterator<MarketEvent> for MarketIter {
    fn from_iter<T: IntoIterator<Item = MarketEvent>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MarketIter {
    type Item = MarketEvent;
    type IntoIter = std::vec::IntoIter<MarketEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Aggressor side of a trade.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum Side {
    #[serde(rename = "buy", alias = "Buy", alias = "BUY")]
    #[display("buy")]
    Buy,
    #[serde(rename = "sell", alias = "Sell", alias = "SELL")]
    #[display("sell")]
    Sell,
}

/// Normalised public trade.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct PublicTrade {
    pub id: SmolStr,
    /// Exchange timestamp in seconds since epoch.
    pub timestamp: f64,
    pub price: f64,
    /// Always positive, direction is carried by `side`.
    pub amount: f64,
    pub side: Side,
}

/// Key identifying one resting level of an order book.
///
/// Delta protocols address levels by a stable exchange id, aggregate protocols address
/// them by price.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum LevelKey {
    #[display("id:{_0}")]
    Id(u64),
    #[display("px:{_0}")]
    Price(Decimal),
}

/// What a [`BookDelta`] does to the level it addresses.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum BookAction {
    Insert,
    Update,
    Delete,
    PartialSnapshot,
}

/// Change to one order book level.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub struct BookDelta {
    pub key: LevelKey,
    /// Level price, absent for identity-addressed updates and deletes that omit it.
    pub price: Option<Decimal>,
    /// Signed resting amount: positive for bids, negative for asks, zero on delete.
    pub size: Decimal,
    pub action: BookAction,
}

impl BookDelta {
    pub fn new(key: LevelKey, price: Option<Decimal>, size: Decimal, action: BookAction) -> Self {
        Self {
            key,
            price,
            size,
            action,
        }
    }

    /// Price-addressed delta, where the price doubles as the level key.
    pub fn at_price(price: Decimal, size: Decimal, action: BookAction) -> Self {
        Self::new(LevelKey::Price(price), Some(price), size, action)
    }

    /// Resolve the level price from the explicit field, falling back to the key.
    pub fn price(&self) -> Option<Decimal> {
        match (self.price, self.key) {
            (Some(price), _) => Some(price),
            (None, LevelKey::Price(price)) => Some(price),
            (None, LevelKey::Id(_)) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_book_delta_price_resolution() {
        struct TestCase {
            input: BookDelta,
            expected: Option<Decimal>,
        }

        let tests = vec![
            TestCase {
                // TC0: price-addressed delta resolves price from key
                input: BookDelta::new(
                    LevelKey::Price(dec!(101.5)),
                    None,
                    dec!(1),
                    BookAction::Update,
                ),
                expected: Some(dec!(101.5)),
            },
            TestCase {
                // TC1: identity-addressed delta w/ explicit price
                input: BookDelta::new(
                    LevelKey::Id(8799),
                    Some(dec!(9500)),
                    dec!(-3),
                    BookAction::Insert,
                ),
                expected: Some(dec!(9500)),
            },
            TestCase {
                // TC2: identity-addressed update w/o price
                input: BookDelta::new(LevelKey::Id(8799), None, dec!(-3), BookAction::Update),
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.price(), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_side_de() {
        for input in [r#""buy""#, r#""Buy""#, r#""BUY""#] {
            assert_eq!(serde_json::from_str::<Side>(input).unwrap(), Side::Buy);
        }
        assert_eq!(serde_json::from_str::<Side>(r#""Sell""#).unwrap(), Side::Sell);
        assert!(serde_json::from_str::<Side>(r#""Unknown""#).is_err());
    }
}
