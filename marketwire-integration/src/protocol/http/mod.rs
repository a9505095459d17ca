use crate::error::SocketError;
use reqwest::{Method, header::HeaderMap};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Bounded-attempt, fixed-delay retry policy applied to every REST request.
///
/// Only timeout-class transport failures are re-attempted; any other transport error and every
/// non-2xx HTTP status fails the request immediately.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub attempts: u8,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u8, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

/// Configurable REST client executing plain JSON requests against venue public endpoints.
///
/// Owns a [`reqwest::Client`] connection pool; cloning is cheap and shares the pool. Venue
/// clients wrap this with their base urls and endpoint paths.
#[derive(Debug, Clone)]
pub struct RestClient {
    /// HTTP [`reqwest::Client`] for executing [`reqwest::Request`]s.
    pub http_client: reqwest::Client,

    /// Retry policy for timeout-class transport failures.
    pub retry: RetryPolicy,
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), RetryPolicy::default())
    }
}

impl RestClient {
    /// Construct a new [`Self`] using the provided connection pool and [`RetryPolicy`].
    pub fn new(http_client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { http_client, retry }
    }

    /// Execute the request and parse the success body as JSON.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<Value, SocketError> {
        self.request_with_headers(method, url, query, body, headers)
            .await
            .map(|(value, _)| value)
    }

    /// Execute the request and parse the success body as JSON, also returning the response
    /// headers for venues that ship observability data there (eg/ Binance used request weight).
    pub async fn request_with_headers(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<(Value, HeaderMap), SocketError> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            debug!(%method, %url, ?query, attempt, "sending HTTP request");

            let mut builder = self.http_client.request(method.clone(), url);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = &body {
                builder = builder.json(body);
            }
            if let Some(headers) = &headers {
                builder = builder.headers(headers.clone());
            }

            match self.execute(builder).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_transport_timeout() && attempt < self.retry.attempts => {
                    error!(
                        %method,
                        %url,
                        attempt,
                        %error,
                        "HTTP request timed out - retrying after fixed delay"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(error) if error.is_transport_timeout() => {
                    error!(%method, %url, attempt, %error, "HTTP request retry budget exhausted");
                    return Err(SocketError::RetriesExhausted { attempts: attempt });
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<(Value, HeaderMap), SocketError> {
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SocketError::HttpResponse(status, body));
        }

        let payload = response.bytes().await?;
        let value =
            serde_json::from_slice::<Value>(&payload).map_err(|error| SocketError::Deserialise {
                error,
                payload: String::from_utf8_lossy(&payload).into_owned(),
            })?;

        Ok((value, headers))
    }
}

/// Retain only the query parameters a caller actually set.
///
/// Venue clients build their parameter maps with `Option`al entries; unset entries must be
/// elided before emission rather than serialised as empty strings.
pub fn filter_params<'a>(params: &[(&'a str, Option<String>)]) -> Vec<(&'a str, String)> {
    params
        .iter()
        .filter_map(|(key, value)| value.clone().map(|value| (*key, value)))
        .collect()
}

/// Communicative alias for venue client signatures.
pub type QueryParams<'a> = Vec<(&'a str, String)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_params_elides_unset_entries() {
        let params = [
            ("symbol", Some("BTCUSDT".to_string())),
            ("limit", None),
            ("category", Some("linear".to_string())),
        ];

        assert_eq!(
            filter_params(&params),
            vec![
                ("symbol", "BTCUSDT".to_string()),
                ("category", "linear".to_string()),
            ]
        );
    }

    #[test]
    fn test_retry_policy_minimum_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.attempts, 1);
    }
}
