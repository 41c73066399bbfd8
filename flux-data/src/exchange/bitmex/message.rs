use serde::{Deserialize, Serialize};

/// Generic [`Bitmex`](super::Bitmex) table message.
///
/// ### Raw Payload Examples
/// See docs: <https://www.bitmex.com/app/wsAPI#Response-Format>
/// ```json
/// {
///     "table": "orderBookL2_25",
///     "action": "update",
///     "data": [{"symbol": "XBTUSD", "id": 8799050000, "side": "Sell", "size": 100}]
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BitmexMessage<T> {
    pub table: String,
    pub action: BitmexAction,
    pub data: Vec<T>,
}

/// Table action of a [`BitmexMessage`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BitmexAction {
    /// Full image of the table, sent once after subscribing.
    Partial,
    Insert,
    Update,
    Delete,
}
