use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::{fmt::Display, str::FromStr};

/// Deserialize a `String` as the desired type.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let data: &str = Deserialize::deserialize(deserializer)?;
    data.parse::<T>().map_err(serde::de::Error::custom)
}

/// Deserialize a `String` of epoch milliseconds as seconds since epoch.
pub fn de_str_epoch_ms_as_secs<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    de_str::<_, i64>(deserializer).map(epoch_ms_as_secs)
}

/// Deserialize an RFC 3339 timestamp (eg/ "2019-08-30T09:28:43.123Z") as a
/// `DateTime<Utc>`.
pub fn de_rfc3339_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let data: &str = Deserialize::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(data)
        .map(|time| time.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

pub fn epoch_ms_as_secs(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Fixture {
        #[serde(deserialize_with = "de_str")]
        price: f64,
        #[serde(deserialize_with = "de_str_epoch_ms_as_secs")]
        ts: f64,
        #[serde(deserialize_with = "de_rfc3339_as_datetime_utc")]
        time: DateTime<Utc>,
    }

    #[test]
    fn test_de_fixture() {
        let input = r#"{"price": "16578.50", "ts": "1672304486865", "time": "2019-08-30T09:28:43.500Z"}"#;
        let actual = serde_json::from_str::<Fixture>(input).unwrap();

        assert_eq!(actual.price, 16578.50);
        assert_eq!(actual.ts, 1672304486.865);
        assert_eq!(actual.time.timestamp_millis(), 1567157323500);
    }

    #[test]
    fn test_de_str_invalid() {
        let input = r#"{"price": "abc", "ts": "1", "time": "2019-08-30T09:28:43Z"}"#;
        assert!(serde_json::from_str::<Fixture>(input).is_err());
    }
}
