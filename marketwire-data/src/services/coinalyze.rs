use crate::error::DataError;
use chrono::Utc;
use marketwire_integration::protocol::http::RestClient;
use parking_lot::Mutex;
use reqwest::{
    Method,
    header::{HeaderMap, HeaderValue},
};
use serde_json::Value;

/// Coinalyze API base url.
pub const HTTP_BASE_URL_COINALYZE: &str = "https://api.coinalyze.net/v1";

/// Supported Coinalyze history intervals with their window length in seconds.
pub const INTERVALS: &[(&str, i64)] = &[
    ("1min", 60),
    ("5min", 60 * 5),
    ("15min", 60 * 15),
    ("30min", 60 * 30),
    ("1hour", 60 * 60),
    ("2hour", 60 * 60 * 2),
    ("4hour", 60 * 60 * 4),
    ("6hour", 60 * 60 * 6),
    ("12hour", 60 * 60 * 12),
    ("daily", 60 * 60 * 24),
    ("weekly", 60 * 60 * 24 * 7),
];

/// Coinalyze aggregated history client.
///
/// Coinalyze rate-limits per key; the client rotates through the provided key set round-robin
/// so heavy polling spreads across keys.
#[derive(Debug)]
pub struct CoinalyzeClient {
    rest: RestClient,
    api_keys: Vec<String>,
    next_key: Mutex<usize>,
}

impl CoinalyzeClient {
    /// At least one API key is required.
    pub fn new(rest: RestClient, api_keys: Vec<String>) -> Result<Self, DataError> {
        if api_keys.is_empty() {
            return Err(DataError::Socket(
                "coinalyze requires at least one api key".to_string(),
            ));
        }
        Ok(Self {
            rest,
            api_keys,
            next_key: Mutex::new(0),
        })
    }

    fn headers(&self) -> Result<HeaderMap, DataError> {
        let key = {
            let mut index = self.next_key.lock();
            let key = self.api_keys[*index].clone();
            *index = (*index + 1) % self.api_keys.len();
            key
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "api_key",
            HeaderValue::from_str(&key).map_err(|error| DataError::Socket(error.to_string()))?,
        );
        Ok(headers)
    }

    /// `(from, to)` epoch-seconds window covering `limit` bars of `interval`, with the same
    /// slack the service expects (a few seconds before the first bar, a few after now).
    fn request_window(interval: &str, limit: i64) -> Result<(i64, i64), DataError> {
        let seconds = INTERVALS
            .iter()
            .find(|(token, _)| *token == interval)
            .map(|(_, seconds)| *seconds)
            .ok_or_else(|| {
                DataError::Socket(format!("unsupported coinalyze interval: {interval}"))
            })?;

        let now = Utc::now().timestamp();
        Ok((now - seconds * limit - 3, now + 10))
    }

    async fn history(
        &self,
        path: &str,
        tickers: &[&str],
        interval: &str,
        limit: i64,
        convert_to_usd: bool,
    ) -> Result<Value, DataError> {
        let (from, to) = Self::request_window(interval, limit)?;
        let url = format!("{HTTP_BASE_URL_COINALYZE}{path}");
        let query = vec![
            ("symbols", tickers.join(",")),
            ("interval", interval.to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("convert_to_usd", convert_to_usd.to_string()),
        ];

        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, Some(self.headers()?))
            .await?)
    }

    /// Aggregated open-interest history. Tickers use Coinalyze's `BTCUSDT_PERP.A` style ids.
    pub async fn open_interest(
        &self,
        tickers: &[&str],
        interval: &str,
        limit: i64,
    ) -> Result<Value, DataError> {
        self.history("/open-interest-history", tickers, interval, limit, false)
            .await
    }

    /// Aggregated liquidation history.
    pub async fn liquidations(
        &self,
        tickers: &[&str],
        interval: &str,
        limit: i64,
        convert_to_usd: bool,
    ) -> Result<Value, DataError> {
        self.history(
            "/liquidation-history",
            tickers,
            interval,
            limit,
            convert_to_usd,
        )
        .await
    }

    /// Exchanges known to Coinalyze, with their single-letter codes.
    pub async fn exchanges(&self) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_COINALYZE}/exchanges");
        Ok(self
            .rest
            .request(Method::GET, &url, &[], None, Some(self.headers()?))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinalyze_requires_a_key() {
        assert!(CoinalyzeClient::new(RestClient::default(), vec![]).is_err());
        assert!(
            CoinalyzeClient::new(RestClient::default(), vec!["key".to_string()]).is_ok()
        );
    }

    #[test]
    fn test_coinalyze_request_window() {
        let (from, to) = CoinalyzeClient::request_window("1hour", 24).unwrap();
        assert_eq!(to - from, 60 * 60 * 24 + 13);

        assert!(CoinalyzeClient::request_window("fortnight", 1).is_err());
    }

    #[test]
    fn test_coinalyze_key_rotation() {
        let client = CoinalyzeClient::new(
            RestClient::default(),
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();

        let first = client.headers().unwrap();
        let second = client.headers().unwrap();
        let third = client.headers().unwrap();

        assert_eq!(first.get("api_key").unwrap(), "a");
        assert_eq!(second.get("api_key").unwrap(), "b");
        assert_eq!(third.get("api_key").unwrap(), "a");
    }
}
