use self::{book::BitfinexBookMessage, channel::BitfinexChannel, trade::BitfinexTradeMessage};
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

/// Order book types for [`Bitfinex`].
pub mod book;

/// Defines the type that translates a [`ChannelKind`] into a [`Bitfinex`] channel.
pub mod channel;

/// Public trade types for [`Bitfinex`].
pub mod trade;

/// [`Bitfinex`] public server base url.
///
/// See docs: <https://docs.bitfinex.com/docs/ws-general>
pub const BASE_URL_BITFINEX: &str = "wss://api-pub.bitfinex.com/ws/2";

/// [`Bitfinex`] exchange.
///
/// Books are price-addressed aggregates: a level with `count == 0` is removed.
///
/// See docs: <https://docs.bitfinex.com/docs/ws-public>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Bitfinex;

impl Connector for Bitfinex {
    const ID: ExchangeId = ExchangeId::Bitfinex;
    const BASE_URL: &'static str = BASE_URL_BITFINEX;

    fn request(
        channel: ChannelKind,
        params: &SubscriptionParams,
    ) -> Result<WsMessage, DataError> {
        let mut request = Map::new();
        request.insert("event".to_owned(), Value::from("subscribe"));
        params.merge_into(&mut request);
        request.insert(
            "channel".to_owned(),
            Value::from(BitfinexChannel::from(channel).as_ref()),
        );

        Ok(WsMessage::text(Value::Object(request).to_string()))
    }

    fn ack(frame: &str) -> SubscriptionAck {
        #[derive(Deserialize)]
        struct BitfinexEvent {
            event: String,
            #[serde(default)]
            msg: Option<String>,
            #[serde(default)]
            code: Option<i64>,
        }

        match serde_json::from_str::<BitfinexEvent>(frame) {
            Ok(event) if event.event == "subscribed" => SubscriptionAck::Subscribed,
            Ok(event) if event.event == "error" => SubscriptionAck::Rejected(format!(
                "{} (code {})",
                event.msg.unwrap_or_default(),
                event.code.unwrap_or_default()
            )),
            _ => SubscriptionAck::Pending,
        }
    }

    fn parser(channel: ChannelKind) -> Box<dyn Parser> {
        match channel.feed() {
            Feed::Book => Box::new(JsonParser::<BitfinexBookMessage>::new()),
            Feed::Trades => Box::new(JsonParser::<BitfinexTradeMessage>::new()),
        }
    }
}
