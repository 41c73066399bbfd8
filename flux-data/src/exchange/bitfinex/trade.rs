use crate::{
    de::epoch_ms_as_secs,
    event::{MarketEvent, MarketIter, PublicTrade, Side},
};
use serde::{Deserialize, Deserializer, de::Error};
use serde_json::Value;
use smol_str::ToSmolStr;

/// Messages received on the [`Bitfinex`](super::Bitfinex) trades channel.
///
/// ### Raw Payload Examples
/// See docs: <https://docs.bitfinex.com/reference/ws-public-trades>
/// ```json
/// [17470, [[401597395, 1574694478808, 0.005, 7245.3], [401597394, 1574694478000, -0.1, 7244.9]]]
/// [17470, "te", [401597395, 1574694478808, 0.005, 7245.3]]
/// [17470, "tu", [401597395, 1574694478808, 0.005, 7245.3]]
/// [17470, "hb"]
/// ```
#[derive(Clone, PartialEq, Debug)]
pub enum BitfinexTradeMessage {
    Heartbeat,
    Snapshot(Vec<BitfinexTrade>),
    /// Trade executed ("te").
    Executed(BitfinexTrade),
    /// Trade execution update ("tu"), a duplicate of a previous "te" message.
    Updated,
}

impl<'de> Deserialize<'de> for BitfinexTradeMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let frame = value
            .as_array()
            .ok_or_else(|| D::Error::custom("expected [chanId, payload] frame"))?;

        match frame.get(1) {
            Some(Value::String(kind)) if kind == "hb" => Ok(Self::Heartbeat),
            Some(Value::String(kind)) if kind == "tu" => Ok(Self::Updated),
            Some(Value::String(kind)) if kind == "te" => frame
                .get(2)
                .ok_or_else(|| D::Error::custom("missing trade after te marker"))
                .and_then(|trade| BitfinexTrade::deserialize(trade).map_err(D::Error::custom))
                .map(Self::Executed),
            Some(snapshot @ Value::Array(_)) => Vec::<BitfinexTrade>::deserialize(snapshot)
                .map(Self::Snapshot)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "unexpected Bitfinex trade payload: {other:?}"
            ))),
        }
    }
}

/// [`Bitfinex`](super::Bitfinex) trade: `[ID, MTS, AMOUNT, PRICE]`.
///
/// A positive `AMOUNT` is a buy, a negative one a sell.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct BitfinexTrade {
    pub id: u64,
    pub time_ms: i64,
    pub amount: f64,
    pub price: f64,
}

impl<'de> Deserialize<'de> for BitfinexTrade {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Vec::<Value>::deserialize(deserializer)?;
        if fields.len() < 4 {
            return Err(D::Error::custom("expected 4 elements in trade array"));
        }

        let number = |index: usize| {
            fields[index]
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("trade element {index} is not a number")))
        };

        Ok(Self {
            id: fields[0]
                .as_u64()
                .ok_or_else(|| D::Error::custom("trade id is not an integer"))?,
            time_ms: fields[1]
                .as_i64()
                .ok_or_else(|| D::Error::custom("trade timestamp is not an integer"))?,
            amount: number(2)?,
            price: number(3)?,
        })
    }
}

impl From<BitfinexTrade> for PublicTrade {
    fn from(trade: BitfinexTrade) -> Self {
        Self {
            id: trade.id.to_smolstr(),
            timestamp: epoch_ms_as_secs(trade.time_ms),
            price: trade.price,
            amount: trade.amount.abs(),
            side: if trade.amount > 0.0 {
                Side::Buy
            } else {
                Side::Sell
            },
        }
    }
}

impl From<BitfinexTradeMessage> for MarketIter {
    fn from(message: BitfinexTradeMessage) -> Self {
        match message {
            BitfinexTradeMessage::Heartbeat => Self::heartbeat(),
            BitfinexTradeMessage::Updated => Self::default(),
            BitfinexTradeMessage::Executed(trade) => {
                Self(vec![MarketEvent::Trade(PublicTrade::from(trade))])
            }
            BitfinexTradeMessage::Snapshot(mut trades) => {
                // Snapshots arrive newest first
                trades.sort_by_key(|trade| (trade.time_ms, trade.id));
                trades
                    .into_iter()
                    .map(|trade| MarketEvent::Trade(PublicTrade::from(trade)))
                    .collect()
            }
        }
    }
}
