use self::{
    ohlc::{OhlcAggregator, OhlcBar},
    raw::RawBuffer,
};
use crate::{
    books::{DepthSnapshot, OrderBookAggregator},
    event::{BookDelta, MarketEvent, MarketIter, PublicTrade},
    exchange::ChannelKind,
    scheduler::Window,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trade to [`OhlcBar`] bucketing.
pub mod ohlc;

/// Raw per-window pass-through buffers.
pub mod raw;

/// Stateful consumer of parsed [`MarketEvent`]s producing one output per window.
pub trait Aggregator {
    type Output;

    /// Apply the events parsed from one frame, received during `window`.
    fn apply(&mut self, window: Window, events: MarketIter);

    /// Seal `window`, returning its output if it has any.
    fn seal(&mut self, window: Window) -> Option<Self::Output>;
}

impl Aggregator for OrderBookAggregator {
    type Output = DepthSnapshot;

    fn apply(&mut self, _: Window, events: MarketIter) {
        self.start_frame();
        for event in events {
            match event {
                MarketEvent::BookDelta(delta) => self.apply_delta(delta),
                MarketEvent::BookReset => self.reset(),
                other => debug!(?other, "order book ignoring non-book event"),
            }
        }
    }

    /// The book outlives windows: every window after priming yields a full snapshot.
    fn seal(&mut self, _: Window) -> Option<Self::Output> {
        self.snapshot()
    }
}

/// Output of one sealed window, handed to a [`Sink`](crate::sink::Sink).
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum WindowPayload {
    Depth(DepthSnapshot),
    Ohlc(OhlcBar),
    Trades(Vec<PublicTrade>),
    BookDeltas(Vec<BookDelta>),
}

/// [`Aggregator`] selected for a [`ChannelKind`] at configuration time.
#[derive(Clone, PartialEq, Debug)]
pub enum ChannelAggregator {
    Book(OrderBookAggregator),
    BookRaw(RawBuffer<BookDelta>),
    Ohlc(OhlcAggregator),
    TradesRaw(RawBuffer<PublicTrade>),
}

impl ChannelAggregator {
    pub fn new(channel: ChannelKind) -> Self {
        match channel {
            ChannelKind::Book => Self::Book(OrderBookAggregator::new()),
            ChannelKind::BookRaw => Self::BookRaw(RawBuffer::new()),
            ChannelKind::Trades => Self::Ohlc(OhlcAggregator::new()),
            ChannelKind::TradesRaw => Self::TradesRaw(RawBuffer::new()),
        }
    }
}

impl Aggregator for ChannelAggregator {
    type Output = WindowPayload;

    fn apply(&mut self, window: Window, events: MarketIter) {
        match self {
            Self::Book(book) => book.apply(window, events),
            Self::BookRaw(buffer) => buffer.apply(window, events),
            Self::Ohlc(ohlc) => ohlc.apply(window, events),
            Self::TradesRaw(buffer) => buffer.apply(window, events),
        }
    }

    fn seal(&mut self, window: Window) -> Option<Self::Output> {
        match self {
            Self::Book(book) => book.seal(window).map(WindowPayload::Depth),
            Self::BookRaw(buffer) => buffer.seal(window).map(WindowPayload::BookDeltas),
            Self::Ohlc(ohlc) => ohlc.seal(window).map(WindowPayload::Ohlc),
            Self::TradesRaw(buffer) => buffer.seal(window).map(WindowPayload::Trades),
        }
    }
}
