use crate::event::{BookAction, BookDelta, MarketEvent, MarketIter};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de::Error};
use serde_json::Value;

/// Messages received on the [`Bitfinex`](super::Bitfinex) book channel.
///
/// ### Raw Payload Examples
/// See docs: <https://docs.bitfinex.com/reference/ws-public-books>
/// ```json
/// [17082, [[7254.7, 3, 3.3], [7254.9, 1, -0.4]]]
/// [17082, [7254.5, 0, 1]]
/// [17082, []]
/// [17082, "hb"]
/// ```
#[derive(Clone, PartialEq, Debug)]
pub enum BitfinexBookMessage {
    Heartbeat,
    Snapshot(Vec<BitfinexLevel>),
    Update(BitfinexLevel),
}

impl<'de> Deserialize<'de> for BitfinexBookMessage {
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
            Some(Value::Array(payload)) if payload.first().is_none_or(Value::is_array) => {
                Vec::<BitfinexLevel>::deserialize(&frame[1])
                    .map(Self::Snapshot)
                    .map_err(D::Error::custom)
            }
            Some(level @ Value::Array(_)) => BitfinexLevel::deserialize(level)
                .map(Self::Update)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "unexpected Bitfinex book payload: {other:?}"
            ))),
        }
    }
}

/// [`Bitfinex`](super::Bitfinex) aggregated level: `[PRICE, COUNT, AMOUNT]`.
///
/// `AMOUNT > 0` is a bid, `AMOUNT < 0` an ask. `COUNT == 0` removes the level.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct BitfinexLevel {
    pub price: Decimal,
    pub count: u64,
    pub amount: Decimal,
}

impl<'de> Deserialize<'de> for BitfinexLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (price, count, amount) = <(Value, Value, Value)>::deserialize(deserializer)?;

        let decimal = |value: &Value, field: &str| -> Result<Decimal, D::Error> {
            match value {
                Value::Number(number) => number
                    .to_string()
                    .parse::<Decimal>()
                    .or_else(|_| Decimal::from_scientific(&number.to_string()))
                    .map_err(|error| D::Error::custom(format!("level {field}: {error}"))),
                other => Err(D::Error::custom(format!(
                    "level {field} is not a number: {other}"
                ))),
            }
        };

        Ok(Self {
            price: decimal(&price, "price")?,
            count: count
                .as_u64()
                .ok_or_else(|| D::Error::custom("level count is not an integer"))?,
            amount: decimal(&amount, "amount")?,
        })
    }
}

impl BitfinexLevel {
    fn delta(self, action: BookAction) -> BookDelta {
        BookDelta::at_price(self.price, self.amount, action)
    }
}

impl From<BitfinexBookMessage> for MarketIter {
    fn from(message: BitfinexBookMessage) -> Self {
        match message {
            BitfinexBookMessage::Heartbeat => Self::heartbeat(),
            BitfinexBookMessage::Snapshot(levels) if levels.is_empty() => {
                Self(vec![MarketEvent::BookReset])
            }
            BitfinexBookMessage::Snapshot(levels) => levels
                .into_iter()
                .map(|level| MarketEvent::BookDelta(level.delta(BookAction::PartialSnapshot)))
                .collect(),
            BitfinexBookMessage::Update(level) if level.count > 0 => {
                Self(vec![MarketEvent::BookDelta(level.delta(BookAction::Update))])
            }
            BitfinexBookMessage::Update(level) => Self(vec![MarketEvent::BookDelta(
                BookDelta::at_price(level.price, Decimal::ZERO, BookAction::Delete),
            )]),
        }
    }
}
