use crate::event::{BookAction, BookDelta, LevelKey};
use derive_more::Constructor;
use fnv::FnvHashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Cumulative [`DepthSnapshot`](depth::DepthSnapshot) view of an order book.
pub mod depth;

pub use depth::{DepthLevel, DepthSnapshot};

/// Resting order book level.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize, Constructor,
)]
pub struct Level {
    pub price: Decimal,
    /// Signed amount: positive for bids, negative for asks.
    pub amount: Decimal,
}

/// Live order book reconstructed from [`BookDelta`]s.
///
/// Levels are keyed by [`LevelKey`], either the exchange level id (delta protocols) or the
/// price itself (aggregate protocols).
///
/// The book is not consistent until the first [`BookAction::PartialSnapshot`] has been
/// applied: until then every other delta is skipped. A contiguous run of
/// `PartialSnapshot` deltas replaces the whole book.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct OrderBookAggregator {
    levels: FnvHashMap<LevelKey, Level>,
    primed: bool,
    in_snapshot: bool,
}

impl OrderBookAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a `PartialSnapshot` has been applied.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn levels(&self) -> &FnvHashMap<LevelKey, Level> {
        &self.levels
    }

    /// Apply every [`BookDelta`] parsed from a single frame.
    ///
    /// A frame starts a new snapshot run, so consecutive snapshot frames each replace the
    /// book rather than accumulate.
    pub fn apply_frame(&mut self, deltas: impl IntoIterator<Item = BookDelta>) {
        self.start_frame();
        deltas.into_iter().for_each(|delta| self.apply_delta(delta));
    }

    pub(crate) fn start_frame(&mut self) {
        self.in_snapshot = false;
    }

    /// Apply a snapshot without levels: clear the book and mark it primed.
    pub fn reset(&mut self) {
        debug!(levels = self.levels.len(), "empty snapshot, clearing book");
        self.levels.clear();
        self.in_snapshot = true;
        self.primed = true;
    }

    pub fn apply_delta(&mut self, delta: BookDelta) {
        if delta.action == BookAction::PartialSnapshot {
            self.apply_snapshot(delta);
            return;
        }

        self.in_snapshot = false;
        if !self.primed {
            debug!(key = %delta.key, action = %delta.action, "book not primed, skipping delta");
            return;
        }

        match delta.action {
            BookAction::Insert => self.insert(delta),
            BookAction::Update => match self.levels.get_mut(&delta.key) {
                Some(level) => {
                    level.amount = delta.size;
                    if let Some(price) = delta.price {
                        level.price = price;
                    }
                }
                None => {
                    debug!(key = %delta.key, "update for absent level, inserting");
                    self.insert(delta);
                }
            },
            BookAction::Delete => {
                if self.levels.remove(&delta.key).is_none() {
                    debug!(key = %delta.key, "delete for absent level, ignoring");
                }
            }
            BookAction::PartialSnapshot => {}
        }
    }

    fn apply_snapshot(&mut self, delta: BookDelta) {
        if !self.in_snapshot {
            self.levels.clear();
            self.in_snapshot = true;
            self.primed = true;
        }
        self.insert(delta);
    }

    fn insert(&mut self, delta: BookDelta) {
        match delta.price() {
            Some(price) => {
                self.levels.insert(delta.key, Level::new(price, delta.size));
            }
            None => {
                warn!(key = %delta.key, action = %delta.action, "level without price, skipping delta");
            }
        }
    }

    /// Build the [`DepthSnapshot`] of the current book, `None` until primed.
    ///
    /// Does not mutate the book: two calls without new deltas yield equal snapshots.
    pub fn snapshot(&self) -> Option<DepthSnapshot> {
        self.primed
            .then(|| DepthSnapshot::from_levels(self.levels.values()))
    }
}
