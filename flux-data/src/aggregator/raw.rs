use super::Aggregator;
use crate::{
    event::{BookDelta, MarketEvent, MarketIter, PublicTrade},
    scheduler::Window,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Extract the payload a [`RawBuffer`] collects from a [`MarketEvent`].
pub trait FromEvent: Sized {
    fn from_event(event: MarketEvent) -> Result<Self, MarketEvent>;
}

impl FromEvent for PublicTrade {
    fn from_event(event: MarketEvent) -> Result<Self, MarketEvent> {
        match event {
            MarketEvent::Trade(trade) => Ok(trade),
            other => Err(other),
        }
    }
}

impl FromEvent for BookDelta {
    fn from_event(event: MarketEvent) -> Result<Self, MarketEvent> {
        match event {
            MarketEvent::BookDelta(delta) => Ok(delta),
            other => Err(other),
        }
    }
}

/// Pass-through buffer keeping every received item, in arrival order, per window.
#[derive(Clone, PartialEq, Debug)]
pub struct RawBuffer<T> {
    windows: BTreeMap<i64, Vec<T>>,
}

impl<T> Default for RawBuffer<T> {
    fn default() -> Self {
        Self {
            windows: BTreeMap::new(),
        }
    }
}

impl<T> RawBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> Aggregator for RawBuffer<T>
where
    T: FromEvent,
{
    type Output = Vec<T>;

    fn apply(&mut self, window: Window, events: MarketIter) {
        let buffer = self.windows.entry(window.start).or_default();
        for event in events {
            match T::from_event(event) {
                Ok(item) => buffer.push(item),
                Err(other) => debug!(?other, "raw buffer ignoring event of another kind"),
            }
        }
    }

    fn seal(&mut self, window: Window) -> Option<Self::Output> {
        self.windows
            .remove(&window.start)
            .filter(|items| !items.is_empty())
    }
}
