use self::{book::OkxOrderBookMessage, channel::OkxChannel, trade::OkxTrades};
use crate::{
    error::DataError,
    exchange::{
        ChannelKind, Connector, ExchangeId, Feed, JsonParser, Parser, PingInterval, ping_every,
        subscription::{SubscriptionAck, SubscriptionParams},
    },
    session::WsMessage,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Order book types for [`Okx`].
pub mod book;

/// Defines the type that translates a [`ChannelKind`] into an [`Okx`] channel.
pub mod channel;

/// Generic [`OkxMessage<T>`](message::OkxMessage) shared by every channel.
pub mod message;

/// Public trade types for [`Okx`].
pub mod trade;

/// [`Okx`] server base url.
///
/// See docs: <https://www.okx.com/docs-v5/en/#overview-api-resources-and-support>
pub const BASE_URL_OKX: &str = "wss://ws.okx.com:8443/ws/v5/public";

/// [`Okx`] server [`PingInterval`] duration.
///
/// See docs: <https://www.okx.com/docs-v5/en/#websocket-api-connect>
pub const PING_INTERVAL_OKX: Duration = Duration::from_secs(29);

/// [`Okx`] exchange.
///
/// See docs: <https://www.okx.com/docs-v5/en/#websocket-api>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Okx;

impl Connector for Okx {
    const ID: ExchangeId = ExchangeId::Okx;
    const BASE_URL: &'static str = BASE_URL_OKX;

    fn ping_interval() -> Option<PingInterval> {
        Some(ping_every(PING_INTERVAL_OKX, || WsMessage::text("ping")))
    }

    fn request(
        channel: ChannelKind,
        params: &SubscriptionParams,
    ) -> Result<WsMessage, DataError> {
        let mut arg = Map::new();
        params.merge_into(&mut arg);
        arg.insert(
            "channel".to_owned(),
            Value::from(OkxChannel::from(channel).as_ref()),
        );

        Ok(WsMessage::text(
            json!({
                "op": "subscribe",
                "args": [arg],
            })
            .to_string(),
        ))
    }

    fn ack(frame: &str) -> SubscriptionAck {
        #[derive(Deserialize)]
        struct OkxEvent {
            event: String,
            #[serde(default)]
            code: Option<String>,
            #[serde(default)]
            msg: Option<String>,
        }

        match serde_json::from_str::<OkxEvent>(frame) {
            Ok(event) if event.event == "subscribe" => SubscriptionAck::Subscribed,
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
            Feed::Book => Box::new(JsonParser::<OkxOrderBookMessage>::new()),
            Feed::Trades => Box::new(JsonParser::<OkxTrades>::new()),
        }
    }
}
