use super::Aggregator;
use crate::{
    event::{MarketEvent, MarketIter, PublicTrade},
    scheduler::Window,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Open, high, low, close and volume of the trades received during one window.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct OhlcBar {
    /// Window start in seconds since epoch.
    pub window_start: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcBar {
    /// Open a bar from the first trade of a window.
    pub fn open(window_start: i64, trade: &PublicTrade) -> Self {
        Self {
            window_start,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.amount,
        }
    }

    pub fn update(&mut self, trade: &PublicTrade) {
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.close = trade.price;
        self.volume += trade.amount;
    }
}

/// Buckets trades into one [`OhlcBar`] per window, in arrival order.
///
/// Trades are assigned to the window in which they were received, never re-sorted by
/// exchange timestamp. A window without trades emits no bar.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct OhlcAggregator {
    bars: BTreeMap<i64, OhlcBar>,
}

impl OhlcAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_trade(&mut self, window: Window, trade: &PublicTrade) {
        self.bars
            .entry(window.start)
            .and_modify(|bar| bar.update(trade))
            .or_insert_with(|| OhlcBar::open(window.start, trade));
    }
}

impl Aggregator for OhlcAggregator {
    type Output = OhlcBar;

    fn apply(&mut self, window: Window, events: MarketIter) {
        for event in events {
            match event {
                MarketEvent::Trade(trade) => self.apply_trade(window, &trade),
                other => debug!(?other, "OHLC aggregator ignoring non-trade event"),
            }
        }
    }

    fn seal(&mut self, window: Window) -> Option<Self::Output> {
        self.bars.remove(&window.start)
    }
}
