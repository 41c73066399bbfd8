use crate::exchange::{ChannelKind, Feed};
use serde::Serialize;

/// Type that defines how to translate a [`ChannelKind`] into a
/// [`Bitmex`](super::Bitmex) table to be subscribed to.
///
/// See docs: <https://www.bitmex.com/app/wsAPI#Subscriptions>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct BitmexChannel(pub &'static str);

impl BitmexChannel {
    /// [`Bitmex`](super::Bitmex) live trades table.
    pub const TRADES: Self = Self("trade");

    /// [`Bitmex`](super::Bitmex) top 25 levels of the level 2 order book.
    pub const ORDER_BOOK_L2_25: Self = Self("orderBookL2_25");
}

impl From<ChannelKind> for BitmexChannel {
    fn from(channel: ChannelKind) -> Self {
        match channel.feed() {
            Feed::Book => Self::ORDER_BOOK_L2_25,
            Feed::Trades => Self::TRADES,
        }
    }
}

impl AsRef<str> for BitmexChannel {
    fn as_ref(&self) -> &str {
        self.0
    }
}
