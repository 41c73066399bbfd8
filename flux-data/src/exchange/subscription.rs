use crate::error::DataError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Exchange specific subscription parameters, passed opaquely through to the subscribe
/// request of the [`Connector`](super::Connector).
///
/// Only the shape is validated: parameters must form a JSON object.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct SubscriptionParams(Map<String, Value>);

impl SubscriptionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any existing value under the same key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate parameters, skipping the provided keys.
    pub fn iter_except<'a>(
        &'a self,
        skip: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
        self.0.iter().filter(move |(key, _)| !skip.contains(&key.as_str()))
    }

    /// Merge these parameters on top of a base request object.
    pub fn merge_into(&self, base: &mut Map<String, Value>) {
        base.extend(self.0.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
}

impl TryFrom<Value> for SubscriptionParams {
    type Error = DataError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(DataError::InvalidSubscription(format!(
                "expected a JSON object, found: {other}"
            ))),
        }
    }
}

impl FromStr for SubscriptionParams {
    type Err = DataError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str::<Value>(input)
            .map_err(|error| DataError::InvalidSubscription(error.to_string()))
            .and_then(Self::try_from)
    }
}

/// Outcome of inspecting a frame received while waiting for the subscription
/// acknowledgement.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SubscriptionAck {
    Subscribed,
    Rejected(String),
    /// Frame unrelated to the subscription, eg/ a welcome banner.
    Pending,
}
