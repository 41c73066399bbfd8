use super::message::OkxMessage;
use crate::{
    de::{de_str, de_str_epoch_ms_as_secs},
    event::{MarketEvent, MarketIter, PublicTrade, Side},
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Terse type alias for an [`Okx`](super::Okx) real-time trades WebSocket message.
pub type OkxTrades = OkxMessage<OkxTrade>;

/// [`Okx`](super::Okx) real-time trade.
///
/// ### Raw Payload Examples
/// See docs: <https://www.okx.com/docs-v5/en/#websocket-api-public-channel-trades-channel>
/// ```json
/// {
///     "instId": "BTC-USDT",
///     "tradeId": "130639474",
///     "px": "42219.9",
///     "sz": "0.12060306",
///     "side": "buy",
///     "ts": "1630048897897",
///     "count": "3"
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct OkxTrade {
    #[serde(rename = "tradeId")]
    pub id: SmolStr,
    #[serde(rename = "px", deserialize_with = "de_str")]
    pub price: f64,
    #[serde(rename = "sz", deserialize_with = "de_str")]
    pub amount: f64,
    pub side: Side,
    #[serde(rename = "ts", deserialize_with = "de_str_epoch_ms_as_secs")]
    pub timestamp: f64,
}

impl From<OkxTrade> for PublicTrade {
    fn from(trade: OkxTrade) -> Self {
        Self {
            id: trade.id,
            timestamp: trade.timestamp,
            price: trade.price,
            amount: trade.amount,
            side: trade.side,
        }
    }
}

impl From<OkxTrades> for MarketIter {
    fn from(trades: OkxTrades) -> Self {
        trades
            .data
            .into_iter()
            .map(|trade| MarketEvent::Trade(PublicTrade::from(trade)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{JsonParser, Parser};
    use smol_str::ToSmolStr;

    #[test]
    fn test_okx_trade_parser() {
        struct TestCase {
            input: &'static str,
            expected: MarketIter,
        }

        let tests = vec![
            TestCase {
                // TC0: two trades in one push
                input: r#"{"arg":{"channel":"trades","instId":"BTC-USDT"},"data":[{"instId":"BTC-USDT","tradeId":"130639474","px":"42219.9","sz":"0.12060306","side":"buy","ts":"1630048897897","count":"3"},{"instId":"BTC-USDT","tradeId":"130639475","px":"42219.8","sz":"0.5","side":"sell","ts":"1630048897900","count":"1"}]}"#,
                expected: MarketIter(vec![
                    MarketEvent::Trade(PublicTrade {
                        id: "130639474".to_smolstr(),
                        timestamp: 1630048897.897,
                        price: 42219.9,
                        amount: 0.12060306,
                        side: Side::Buy,
                    }),
                    MarketEvent::Trade(PublicTrade {
                        id: "130639475".to_smolstr(),
                        timestamp: 1630048897.9,
                        price: 42219.8,
                        amount: 0.5,
                        side: Side::Sell,
                    }),
                ]),
            },
            TestCase {
                // TC1: subscription event is unparsed
                input: r#"{"event":"subscribe","arg":{"channel":"trades","instId":"BTC-USDT"},"connId":"a4d3ae55"}"#,
                expected: MarketIter::unparsed(
                    r#"{"event":"subscribe","arg":{"channel":"trades","instId":"BTC-USDT"},"connId":"a4d3ae55"}"#,
                ),
            },
            TestCase {
                // TC2: non-numeric price is unparsed
                input: r#"{"arg":{"channel":"trades"},"data":[{"tradeId":"1","px":"abc","sz":"1","side":"buy","ts":"1"}]}"#,
                expected: MarketIter::unparsed(
                    r#"{"arg":{"channel":"trades"},"data":[{"tradeId":"1","px":"abc","sz":"1","side":"buy","ts":"1"}]}"#,
                ),
            },
        ];

        let parser = JsonParser::<OkxTrades>::new();
        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(parser.parse(test.input), test.expected, "TC{} failed", index);
        }
    }
}
