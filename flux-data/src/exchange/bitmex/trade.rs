use super::message::{BitmexAction, BitmexMessage};
use crate::{
    de::{de_rfc3339_as_datetime_utc, epoch_ms_as_secs},
    event::{MarketEvent, MarketIter, PublicTrade, Side},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, ToSmolStr};

/// Terse type alias for a [`Bitmex`](super::Bitmex) real-time trades WebSocket message.
pub type BitmexTradeMessage = BitmexMessage<BitmexTrade>;

/// ### Raw Payload Examples
/// See docs: <https://www.bitmex.com/app/wsAPI#Trades>
/// ```json
/// {
///     "timestamp": "2019-08-30T09:28:43.123Z",
///     "symbol": "XBTUSD",
///     "side": "Sell",
///     "size": 500,
///     "price": 9580.5,
///     "tickDirection": "MinusTick",
///     "trdMatchID": "a2b5c8e1-4f3d-2a1b-9c8d-7e6f5a4b3c2d",
///     "grossValue": 5219100,
///     "homeNotional": 0.052191,
///     "foreignNotional": 500
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BitmexTrade {
    #[serde(deserialize_with = "de_rfc3339_as_datetime_utc")]
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub size: f64,
    pub price: f64,
    #[serde(rename = "trdMatchID", default)]
    pub trade_match_id: Option<SmolStr>,
}

impl BitmexTrade {
    /// Convert into a [`PublicTrade`], falling back to the millisecond timestamp offset by
    /// the row position when the exchange omits the match id.
    fn into_public_trade(self, row: usize) -> PublicTrade {
        let time_ms = self.timestamp.timestamp_millis();
        PublicTrade {
            id: self
                .trade_match_id
                .unwrap_or_else(|| (time_ms + row as i64).to_smolstr()),
            timestamp: epoch_ms_as_secs(time_ms),
            price: self.price,
            amount: self.size,
            side: self.side,
        }
    }
}

impl From<BitmexTradeMessage> for MarketIter {
    fn from(message: BitmexTradeMessage) -> Self {
        match message.action {
            BitmexAction::Partial | BitmexAction::Insert => message
                .data
                .into_iter()
                .enumerate()
                .map(|(row, trade)| MarketEvent::Trade(trade.into_public_trade(row)))
                .collect(),
            BitmexAction::Update | BitmexAction::Delete => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{JsonParser, Parser};

    #[test]
    fn test_bitmex_trade_parser() {
        struct TestCase {
            input: &'static str,
            expected: MarketIter,
        }

        let tests = vec![
            TestCase {
                // TC0: insert w/ match id
                input: r#"{"table":"trade","action":"insert","data":[{"timestamp":"2019-08-30T09:28:43.500Z","symbol":"XBTUSD","side":"Sell","size":500,"price":9580.5,"tickDirection":"MinusTick","trdMatchID":"a2b5c8e1","grossValue":5219100}]}"#,
                expected: MarketIter(vec![MarketEvent::Trade(PublicTrade {
                    id: "a2b5c8e1".to_smolstr(),
                    timestamp: 1567157323.5,
                    price: 9580.5,
                    amount: 500.0,
                    side: Side::Sell,
                })]),
            },
            TestCase {
                // TC1: rows w/o match id use timestamp ms + row position
                input: r#"{"table":"trade","action":"partial","data":[{"timestamp":"2019-08-30T09:28:43.500Z","side":"Buy","size":1,"price":9580},{"timestamp":"2019-08-30T09:28:43.500Z","side":"Buy","size":2,"price":9581}]}"#,
                expected: MarketIter(vec![
                    MarketEvent::Trade(PublicTrade {
                        id: "1567157323500".to_smolstr(),
                        timestamp: 1567157323.5,
                        price: 9580.0,
                        amount: 1.0,
                        side: Side::Buy,
                    }),
                    MarketEvent::Trade(PublicTrade {
                        id: "1567157323501".to_smolstr(),
                        timestamp: 1567157323.5,
                        price: 9581.0,
                        amount: 2.0,
                        side: Side::Buy,
                    }),
                ]),
            },
            TestCase {
                // TC2: welcome banner is unparsed
                input: r#"{"info":"Welcome to the BitMEX Realtime API.","version":"2.0.0"}"#,
                expected: MarketIter::unparsed(
                    r#"{"info":"Welcome to the BitMEX Realtime API.","version":"2.0.0"}"#,
                ),
            },
            TestCase {
                // TC3: invalid timestamp is unparsed
                input: r#"{"table":"trade","action":"insert","data":[{"timestamp":"yesterday","side":"Buy","size":1,"price":9580}]}"#,
                expected: MarketIter::unparsed(
                    r#"{"table":"trade","action":"insert","data":[{"timestamp":"yesterday","side":"Buy","size":1,"price":9580}]}"#,
                ),
            },
        ];

        let parser = JsonParser::<BitmexTradeMessage>::new();
        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(parser.parse(test.input), test.expected, "TC{} failed", index);
        }
    }
}
