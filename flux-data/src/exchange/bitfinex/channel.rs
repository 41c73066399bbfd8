use crate::exchange::{ChannelKind, Feed};
use serde::Serialize;

/// Type that defines how to translate a [`ChannelKind`] into a
/// [`Bitfinex`](super::Bitfinex) channel to be subscribed to.
///
/// See docs: <https://docs.bitfinex.com/docs/ws-public>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct BitfinexChannel(pub &'static str);

impl BitfinexChannel {
    /// [`Bitfinex`](super::Bitfinex) real-time trades channel.
    ///
    /// See docs: <https://docs.bitfinex.com/reference/ws-public-trades>
    pub const TRADES: Self = Self("trades");

    /// [`Bitfinex`](super::Bitfinex) order book channel, precision and length are set
    /// through subscription parameters (`prec`, `freq`, `len`).
    ///
    /// See docs: <https://docs.bitfinex.com/reference/ws-public-books>
    pub const BOOK: Self = Self("book");
}

impl From<ChannelKind> for BitfinexChannel {
    fn from(channel: ChannelKind) -> Self {
        match channel.feed() {
            Feed::Book => Self::BOOK,
            Feed::Trades => Self::TRADES,
        }
    }
}

impl AsRef<str> for BitfinexChannel {
    fn as_ref(&self) -> &str {
        self.0
    }
}
