use self::{book::BitmexBookMessage, channel::BitmexChannel, trade::BitmexTradeMessage};
use crate::{
    error::DataError,
    exchange::{
        ChannelKind, Connector, ExchangeId, Feed, JsonParser, Parser,
        subscription::{SubscriptionAck, SubscriptionParams},
    },
    session::WsMessage,
};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Level 2 order book types for [`Bitmex`].
pub mod book;

/// Defines the type that translates a [`ChannelKind`] into a [`Bitmex`] table.
pub mod channel;

/// Generic [`BitmexMessage<T>`](message::BitmexMessage) shared by every table.
pub mod message;

/// Public trade types for [`Bitmex`].
pub mod trade;

/// [`Bitmex`] server base url.
///
/// See docs: <https://www.bitmex.com/app/wsAPI>
pub const BASE_URL_BITMEX: &str = "wss://www.bitmex.com/realtime";

/// [`Bitmex`] exchange.
///
/// Books are identity-addressed: every level carries a stable `id`, and updates or
/// deletes may omit the price.
///
/// See docs: <https://www.bitmex.com/app/wsAPI>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Bitmex;

impl Bitmex {
    /// Subscription topic, `table` or `table:symbol`.
    fn topic(channel: ChannelKind, params: &SubscriptionParams) -> Result<String, DataError> {
        let table = BitmexChannel::from(channel);
        match params.get("symbol") {
            None => Ok(table.as_ref().to_owned()),
            Some(Value::String(symbol)) => Ok(format!("{}:{symbol}", table.as_ref())),
            Some(other) => Err(DataError::InvalidSubscription(format!(
                "Bitmex symbol must be a string, found: {other}"
            ))),
        }
    }
}

impl Connector for Bitmex {
    const ID: ExchangeId = ExchangeId::Bitmex;
    const BASE_URL: &'static str = BASE_URL_BITMEX;

    fn request(
        channel: ChannelKind,
        params: &SubscriptionParams,
    ) -> Result<WsMessage, DataError> {
        let topic = Self::topic(channel, params)?;

        let mut request = Map::new();
        request.insert("op".to_owned(), Value::from("subscribe"));
        request.extend(
            params
                .iter_except(&["symbol"])
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        request.insert("args".to_owned(), Value::from(vec![topic]));

        Ok(WsMessage::text(Value::Object(request).to_string()))
    }

    fn ack(frame: &str) -> SubscriptionAck {
        #[derive(Deserialize)]
        struct BitmexResponse {
            #[serde(default)]
            success: Option<bool>,
            #[serde(default)]
            error: Option<String>,
        }

        match serde_json::from_str::<BitmexResponse>(frame) {
            Ok(BitmexResponse {
                error: Some(error), ..
            }) => SubscriptionAck::Rejected(error),
            Ok(BitmexResponse {
                success: Some(true),
                ..
            }) => SubscriptionAck::Subscribed,
            _ => SubscriptionAck::Pending,
        }
    }

    fn parser(channel: ChannelKind) -> Box<dyn Parser> {
        match channel.feed() {
            Feed::Book => Box::new(JsonParser::<BitmexBookMessage>::new()),
            Feed::Trades => Box::new(JsonParser::<BitmexTradeMessage>::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_json(channel: ChannelKind, params: &SubscriptionParams) -> Value {
        let WsMessage::Text(request) = Bitmex::request(channel, params).unwrap() else {
            panic!("expected text request")
        };
        serde_json::from_str(request.as_str()).unwrap()
    }

    #[test]
    fn test_bitmex_request() {
        struct TestCase {
            channel: ChannelKind,
            params: SubscriptionParams,
            expected: Value,
        }

        let tests = vec![
            TestCase {
                // TC0: symbol is folded into the topic
                channel: ChannelKind::Book,
                params: SubscriptionParams::new().with("symbol", "XBTUSD"),
                expected: json!({"op": "subscribe", "args": ["orderBookL2_25:XBTUSD"]}),
            },
            TestCase {
                // TC1: no symbol subscribes to the whole table
                channel: ChannelKind::TradesRaw,
                params: SubscriptionParams::new(),
                expected: json!({"op": "subscribe", "args": ["trade"]}),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(
                request_json(test.channel, &test.params),
                test.expected,
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_bitmex_request_invalid_symbol() {
        let params = SubscriptionParams::new().with("symbol", 42);
        assert!(matches!(
            Bitmex::request(ChannelKind::Trades, &params),
            Err(DataError::InvalidSubscription(_))
        ));
    }

    #[test]
    fn test_bitmex_ack() {
        struct TestCase {
            input: &'static str,
            expected: SubscriptionAck,
        }

        let tests = vec![
            TestCase {
                // TC0: welcome banner
                input: r#"{"info":"Welcome to the BitMEX Realtime API.","version":"2.0.0","timestamp":"2019-08-30T09:28:43.123Z"}"#,
                expected: SubscriptionAck::Pending,
            },
            TestCase {
                // TC1: subscribed
                input: r#"{"success":true,"subscribe":"trade:XBTUSD","request":{"op":"subscribe","args":["trade:XBTUSD"]}}"#,
                expected: SubscriptionAck::Subscribed,
            },
            TestCase {
                // TC2: error
                input: r#"{"status":400,"error":"Unknown table: trades","request":{"op":"subscribe","args":["trades"]}}"#,
                expected: SubscriptionAck::Rejected("Unknown table: trades".to_string()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(Bitmex::ack(test.input), test.expected, "TC{} failed", index);
        }
    }
}
