use super::message::{BitmexAction, BitmexMessage};
use crate::event::{BookAction, BookDelta, LevelKey, MarketEvent, MarketIter, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Terse type alias for a [`Bitmex`](super::Bitmex) `orderBookL2_25` WebSocket message.
pub type BitmexBookMessage = BitmexMessage<BitmexLevel>;

/// [`Bitmex`](super::Bitmex) level 2 order book row, addressed by a stable `id`.
///
/// `update` rows may omit `price`, `delete` rows usually carry only `id` and `side`.
///
/// ### Raw Payload Examples
/// See docs: <https://www.bitmex.com/app/wsAPI#OrderBookL2>
/// ```json
/// {"symbol": "XBTUSD", "id": 8799050000, "side": "Sell", "size": 100, "price": 9500}
/// ```
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct BitmexLevel {
    pub id: u64,
    pub side: Side,
    #[serde(default)]
    pub size: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl BitmexLevel {
    /// Resting amount signed by side: positive for bids, negative for asks.
    fn signed_size(&self) -> Option<Decimal> {
        self.size.map(|size| match self.side {
            Side::Buy => size,
            Side::Sell => -size,
        })
    }

    fn delta(self, action: BookAction) -> Option<BookDelta> {
        let size = match action {
            BookAction::Delete => Decimal::ZERO,
            _ => self.signed_size()?,
        };

        Some(BookDelta::new(
            LevelKey::Id(self.id),
            self.price,
            size,
            action,
        ))
    }
}

impl From<BitmexAction> for BookAction {
    fn from(action: BitmexAction) -> Self {
        match action {
            BitmexAction::Partial => BookAction::PartialSnapshot,
            BitmexAction::Insert => BookAction::Insert,
            BitmexAction::Update => BookAction::Update,
            BitmexAction::Delete => BookAction::Delete,
        }
    }
}

impl From<BitmexBookMessage> for MarketIter {
    fn from(message: BitmexBookMessage) -> Self {
        let action = BookAction::from(message.action);
        let deltas = message
            .data
            .into_iter()
            .filter_map(|level| level.delta(action))
            .map(MarketEvent::BookDelta)
            .collect::<Vec<_>>();

        if deltas.is_empty() && action == BookAction::PartialSnapshot {
            return Self(vec![MarketEvent::BookReset]);
        }

        Self(deltas)
    }
}
