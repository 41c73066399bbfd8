use super::message::{OkxAction, OkxMessage};
use crate::event::{BookAction, BookDelta, MarketEvent, MarketIter};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Terse type alias for an [`Okx`](super::Okx) `books` WebSocket message.
pub type OkxOrderBookMessage = OkxMessage<OkxOrderBookData>;

/// [`Okx`](super::Okx) order book push.
///
/// ### Raw Payload Examples
/// See docs: <https://www.okx.com/docs-v5/en/#order-book-trading-market-data-ws-order-book-channel>
/// ```json
/// {
///     "asks": [["8476.98", "415", "0", "13"]],
///     "bids": [["8476.97", "256", "0", "12"]],
///     "ts": "1597026383085",
///     "checksum": -855196043
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct OkxOrderBookData {
    pub asks: Vec<OkxLevel>,
    pub bids: Vec<OkxLevel>,
}

/// [`Okx`](super::Okx) order book level: `["price", "size", "deprecated", "numOrders"]`.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize)]
pub struct OkxLevel {
    pub price: Decimal,
    pub amount: Decimal,
    pub num_orders: u32,
}

impl<'de> Deserialize<'de> for OkxLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields: Vec<String> = Deserialize::deserialize(deserializer)?;
        if fields.len() < 4 {
            return Err(serde::de::Error::custom("expected 4 elements in level array"));
        }

        Ok(OkxLevel {
            price: Decimal::from_str(&fields[0]).map_err(serde::de::Error::custom)?,
            amount: Decimal::from_str(&fields[1]).map_err(serde::de::Error::custom)?,
            num_orders: fields[3].parse().map_err(serde::de::Error::custom)?,
        })
    }
}

impl OkxLevel {
    /// Price-addressed delta, `sign` being `1` for bids and `-1` for asks.
    fn delta(self, sign: Decimal, snapshot: bool) -> BookDelta {
        let action = match (snapshot, self.amount.is_zero()) {
            (true, _) => BookAction::PartialSnapshot,
            (false, true) => BookAction::Delete,
            (false, false) => BookAction::Update,
        };

        BookDelta::at_price(self.price, self.amount * sign, action)
    }
}

impl From<OkxOrderBookMessage> for MarketIter {
    fn from(message: OkxOrderBookMessage) -> Self {
        // Channels without an action, eg/ books5, push full snapshots
        let snapshot = !matches!(message.action, Some(OkxAction::Update));

        let deltas = message
            .data
            .into_iter()
            .flat_map(|book| {
                let bids = book.bids.into_iter().map(|level| (level, Decimal::ONE));
                let asks = book
                    .asks
                    .into_iter()
                    .map(|level| (level, Decimal::NEGATIVE_ONE));
                bids.chain(asks)
            })
            .filter(|(level, _)| !(snapshot && level.amount.is_zero()))
            .map(|(level, sign)| MarketEvent::BookDelta(level.delta(sign, snapshot)))
            .collect::<Vec<_>>();

        if deltas.is_empty() && snapshot {
            return Self(vec![MarketEvent::BookReset]);
        }

        Self(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{JsonParser, Parser};
    use rust_decimal_macros::dec;

    fn delta(price: Decimal, size: Decimal, action: BookAction) -> MarketEvent {
        MarketEvent::BookDelta(BookDelta::at_price(price, size, action))
    }

    #[test]
    fn test_okx_book_parser() {
        struct TestCase {
            input: &'static str,
            expected: MarketIter,
        }

        let tests = vec![
            TestCase {
                // TC0: snapshot, asks are negated
                input: r#"{"arg":{"channel":"books","instId":"BTC-USDT"},"action":"snapshot","data":[{"asks":[["8476.98","415","0","13"]],"bids":[["8476.97","256","0","12"]],"ts":"1597026383085","checksum":-855196043}]}"#,
                expected: MarketIter(vec![
                    delta(dec!(8476.97), dec!(256), BookAction::PartialSnapshot),
                    delta(dec!(8476.98), dec!(-415), BookAction::PartialSnapshot),
                ]),
            },
            TestCase {
                // TC1: update w/ a removed bid and a changed ask
                input: r#"{"arg":{"channel":"books","instId":"BTC-USDT"},"action":"update","data":[{"asks":[["8476.98","100","0","2"]],"bids":[["8476.97","0","0","0"]],"ts":"1597026383086","checksum":1}]}"#,
                expected: MarketIter(vec![
                    delta(dec!(8476.97), dec!(0), BookAction::Delete),
                    delta(dec!(8476.98), dec!(-100), BookAction::Update),
                ]),
            },
            TestCase {
                // TC2: books5 push w/o action is a full snapshot
                input: r#"{"arg":{"channel":"books5","instId":"BTC-USDT"},"data":[{"asks":[],"bids":[["100","5","0","1"]],"ts":"1597026383085"}]}"#,
                expected: MarketIter(vec![delta(dec!(100), dec!(5), BookAction::PartialSnapshot)]),
            },
            TestCase {
                // TC3: snapshot w/o levels resets the book
                input: r#"{"arg":{"channel":"books","instId":"BTC-USDT"},"action":"snapshot","data":[{"asks":[],"bids":[],"ts":"1597026383085","checksum":0}]}"#,
                expected: MarketIter(vec![MarketEvent::BookReset]),
            },
            TestCase {
                // TC4: short level is unparsed
                input: r#"{"arg":{"channel":"books"},"action":"update","data":[{"asks":[["1","2"]],"bids":[]}]}"#,
                expected: MarketIter::unparsed(
                    r#"{"arg":{"channel":"books"},"action":"update","data":[{"asks":[["1","2"]],"bids":[]}]}"#,
                ),
            },
        ];

        let parser = JsonParser::<OkxOrderBookMessage>::new();
        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(parser.parse(test.input), test.expected, "TC{} failed", index);
        }
    }
}
