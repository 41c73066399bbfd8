use crate::exchange::{ChannelKind, Feed};
use serde::Serialize;

/// Type that defines how to translate a [`ChannelKind`] into an
/// [`Okx`](super::Okx) channel to be subscribed to.
///
/// See docs: <https://www.okx.com/docs-v5/en/#websocket-api-public-channel>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct OkxChannel(pub &'static str);

impl OkxChannel {
    /// [`Okx`](super::Okx) real-time trades channel.
    ///
    /// See docs: <https://www.okx.com/docs-v5/en/#websocket-api-public-channel-trades-channel>
    pub const TRADES: Self = Self("trades");

    /// [`Okx`](super::Okx) 400 level order book channel, a snapshot followed by
    /// incremental updates.
    ///
    /// See docs: <https://www.okx.com/docs-v5/en/#order-book-trading-market-data-ws-order-book-channel>
    pub const BOOKS: Self = Self("books");
}

impl From<ChannelKind> for OkxChannel {
    fn from(channel: ChannelKind) -> Self {
        match channel.feed() {
            Feed::Book => Self::BOOKS,
            Feed::Trades => Self::TRADES,
        }
    }
}

impl AsRef<str> for OkxChannel {
    fn as_ref(&self) -> &str {
        self.0
    }
}
