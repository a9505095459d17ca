/// Determine the `DateTime<Utc>` from the provided `Duration` since the epoch.
pub fn datetime_utc_from_epoch_duration(
    duration: std::time::Duration,
) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::from(std::time::UNIX_EPOCH + duration)
}

/// Deserialize a `String` as the desired type.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::de::Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let data: std::borrow::Cow<'de, str> = serde::de::Deserialize::deserialize(deserializer)?;
    data.parse::<T>().map_err(serde::de::Error::custom)
}

/// Deserialize a value the venue ships either as a JSON number or as a numeric string.
pub fn de_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match serde::Deserialize::deserialize(deserializer)? {
        NumberOrString::Number(number) => Ok(number),
        NumberOrString::String(string) => string.parse().map_err(serde::de::Error::custom),
    }
}

/// Deserialize an epoch-milliseconds value the venue ships either as a JSON integer or as a
/// numeric string (potentially fractional, eg/ Gate's `create_time_ms`).
pub fn de_flexible_epoch_ms<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    de_flexible_f64(deserializer).map(|ms| ms as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Row {
        #[serde(deserialize_with = "de_str")]
        price: f64,
        #[serde(deserialize_with = "de_flexible_f64")]
        volume: f64,
        #[serde(deserialize_with = "de_flexible_epoch_ms")]
        time: i64,
    }

    #[test]
    fn test_de_helpers() {
        let actual = serde_json::from_str::<Row>(
            r#"{"price":"30000.5","volume":12.25,"time":"1700000000123.0"}"#,
        )
        .unwrap();

        assert_eq!(
            actual,
            Row {
                price: 30000.5,
                volume: 12.25,
                time: 1700000000123,
            }
        );

        let actual =
            serde_json::from_str::<Row>(r#"{"price":"x","volume":1,"time":0}"#);
        assert!(actual.is_err());
    }
}
