use self::{
    bitfinex::Bitfinex,
    bitmex::Bitmex,
    okx::Okx,
    subscription::{SubscriptionAck, SubscriptionParams},
};
use crate::{
    error::DataError,
    event::MarketIter,
    session::WsMessage,
};
use derive_more::Display;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt::Debug, marker::PhantomData, str::FromStr, time::Duration};
use url::Url;

/// `Bitfinex` [`Connector`] and parsers for its trades and book channels.
pub mod bitfinex;

/// `Bitmex` [`Connector`] and parsers for its trade and orderBookL2_25 tables.
pub mod bitmex;

/// `Okx` [`Connector`] and parsers for its trades and books channels.
pub mod okx;

/// Subscription parameters and acknowledgement types shared by every [`Connector`].
pub mod subscription;

/// Unique identifier of every exchange supported by `flux-data`.
///
/// Resolved once at configuration time, after which each pipeline holds concrete
/// [`Parser`] and [`Connector`] behaviour.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    #[display("bitfinex")]
    Bitfinex,
    #[display("bitmex")]
    Bitmex,
    #[display("okx")]
    Okx,
}

impl FromStr for ExchangeId {
    type Err = DataError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "bitfinex" => Ok(Self::Bitfinex),
            "bitmex" => Ok(Self::Bitmex),
            "okx" => Ok(Self::Okx),
            _ => Err(DataError::UnknownExchange(input.to_owned())),
        }
    }
}

impl ExchangeId {
    /// Default public WebSocket endpoint.
    pub fn url(self) -> Result<Url, DataError> {
        match self {
            Self::Bitfinex => Bitfinex::url(),
            Self::Bitmex => Bitmex::url(),
            Self::Okx => Okx::url(),
        }
    }

    pub fn ping_interval(self) -> Option<PingInterval> {
        match self {
            Self::Bitfinex => Bitfinex::ping_interval(),
            Self::Bitmex => Bitmex::ping_interval(),
            Self::Okx => Okx::ping_interval(),
        }
    }

    /// Build the single subscribe request sent once the connection is established.
    pub fn request(
        self,
        channel: ChannelKind,
        params: &SubscriptionParams,
    ) -> Result<WsMessage, DataError> {
        match self {
            Self::Bitfinex => Bitfinex::request(channel, params),
            Self::Bitmex => Bitmex::request(channel, params),
            Self::Okx => Okx::request(channel, params),
        }
    }

    /// Classify a frame received while waiting for the subscription acknowledgement.
    pub fn ack(self, frame: &str) -> SubscriptionAck {
        match self {
            Self::Bitfinex => Bitfinex::ack(frame),
            Self::Bitmex => Bitmex::ack(frame),
            Self::Okx => Okx::ack(frame),
        }
    }

    /// Resolve the [`Parser`] for a [`ChannelKind`].
    pub fn parser(self, channel: ChannelKind) -> Box<dyn Parser> {
        match self {
            Self::Bitfinex => Bitfinex::parser(channel),
            Self::Bitmex => Bitmex::parser(channel),
            Self::Okx => Okx::parser(channel),
        }
    }
}

/// Channel kinds a pipeline can capture.
///
/// `book` and `trades` are aggregated (depth snapshots and OHLC bars), their `_raw`
/// counterparts pass every parsed delta or trade through untouched.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[display("book")]
    Book,
    #[display("book_raw")]
    BookRaw,
    #[display("trades")]
    Trades,
    #[display("trades_raw")]
    TradesRaw,
}

impl ChannelKind {
    pub const ALL: [Self; 4] = [Self::Book, Self::BookRaw, Self::Trades, Self::TradesRaw];

    /// Underlying exchange feed the channel kind is derived from.
    pub fn feed(self) -> Feed {
        match self {
            Self::Book | Self::BookRaw => Feed::Book,
            Self::Trades | Self::TradesRaw => Feed::Trades,
        }
    }
}

impl FromStr for ChannelKind {
    type Err = DataError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "book" => Ok(Self::Book),
            "book_raw" => Ok(Self::BookRaw),
            "trades" => Ok(Self::Trades),
            "trades_raw" => Ok(Self::TradesRaw),
            _ => Err(DataError::UnknownChannel(input.to_owned())),
        }
    }
}

/// Exchange feed family.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Feed {
    Book,
    Trades,
}

/// Defines the [`PingInterval`] a [`Connector`] requires to keep a connection alive
/// beyond WebSocket protocol level pings.
#[derive(Debug)]
pub struct PingInterval {
    pub interval: tokio::time::Interval,
    pub ping: fn() -> WsMessage,
}

/// Exchange integration: endpoint, subscribe request, acknowledgement and parser
/// selection.
pub trait Connector {
    /// Unique identifier for the exchange server being connected with.
    const ID: ExchangeId;

    /// Base WebSocket url.
    const BASE_URL: &'static str;

    fn url() -> Result<Url, DataError> {
        Url::parse(Self::BASE_URL)
            .map_err(|error| DataError::Url(format!("{}: {error}", Self::ID)))
    }

    /// Defines [`PingInterval`] of custom application-level pings for the exchange server.
    fn ping_interval() -> Option<PingInterval> {
        None
    }

    /// Build the subscribe request for a [`ChannelKind`], merging in the caller's
    /// [`SubscriptionParams`].
    fn request(channel: ChannelKind, params: &SubscriptionParams)
    -> Result<WsMessage, DataError>;

    /// Classify a frame received before the session is subscribed.
    fn ack(frame: &str) -> SubscriptionAck;

    fn parser(channel: ChannelKind) -> Box<dyn Parser>;
}

/// Maps raw frames of one exchange feed into [`MarketEvent`](crate::event::MarketEvent)s.
///
/// Implementations are total: a frame that matches no known shape yields
/// [`MarketEvent::Unparsed`](crate::event::MarketEvent::Unparsed), never an error.
pub trait Parser: Debug + Send + Sync {
    fn parse(&self, frame: &str) -> MarketIter;
}

/// Generic [`Parser`] deserialising a frame into an exchange `Message` and converting it
/// into a [`MarketIter`].
pub struct JsonParser<Message> {
    phantom: PhantomData<fn() -> Message>,
}

impl<Message> JsonParser<Message> {
    pub fn new() -> Self {
        Self {
            phantom: PhantomData,
        }
    }
}

impl<Message> Default for JsonParser<Message> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Message> Debug for JsonParser<Message> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonParser")
            .field("message", &std::any::type_name::<Message>())
            .finish()
    }
}

impl<Message> Parser for JsonParser<Message>
where
    Message: DeserializeOwned + Into<MarketIter>,
{
    fn parse(&self, frame: &str) -> MarketIter {
        if is_pong(frame) {
            return MarketIter::heartbeat();
        }

        match serde_json::from_str::<Message>(frame) {
            Ok(message) => message.into(),
            Err(_) => MarketIter::unparsed(frame),
        }
    }
}

/// Text-level application pong, sent in reply to a [`PingInterval`] ping.
fn is_pong(frame: &str) -> bool {
    frame.trim() == "pong"
}

/// Interval used by exchanges that require application-level pings, first ticking one
/// `period` after creation.
pub(crate) fn ping_every(period: Duration, ping: fn() -> WsMessage) -> PingInterval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    PingInterval { interval, ping }
}
