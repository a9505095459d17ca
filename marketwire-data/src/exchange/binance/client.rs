use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use marketwire_instrument::{Timeframe, Venue};
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

/// [`Binance`](super::Binance) spot server base url.
pub const HTTP_BASE_URL_BINANCE_SPOT: &str = "https://api.binance.com";

/// [`Binance`](super::Binance) USDT-margined futures server base url.
pub const HTTP_BASE_URL_BINANCE_FUTURES: &str = "https://fapi.binance.com";

/// Binance snapshot client.
///
/// Binance reports the request weight consumed in the rolling minute via the
/// `x-mbx-used-weight-1m` response header; every request logs it for observability.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    rest: RestClient,
}

impl BinanceClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value, DataError> {
        let (value, headers) = self
            .rest
            .request_with_headers(Method::GET, url, query, None, None)
            .await?;

        match headers
            .get("x-mbx-used-weight-1m")
            .and_then(|weight| weight.to_str().ok())
            .and_then(|weight| weight.parse::<u32>().ok())
        {
            Some(used_weight) => debug!(used_weight, %url, "binance request weight"),
            None => warn!(%url, "can not read binance used weight header"),
        }

        Ok(value)
    }
}

#[async_trait]
impl MarketClient for BinanceClient {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    /// 24h statistics for the spot market. Weight: 1 for a single symbol, 40 for all.
    async fn ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BINANCE_SPOT}/api/v3/ticker/24hr");
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        self.get(&url, &query).await
    }

    /// 24h statistics for the USDT-margined futures market.
    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BINANCE_FUTURES}/fapi/v1/ticker/24hr");
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        self.get(&url, &query).await
    }

    /// Funding rate via the premium index endpoint.
    async fn funding_rate(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BINANCE_FUTURES}/fapi/v1/premiumIndex");
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        self.get(&url, &query).await
    }

    /// Open interest for one symbol - Binance has no whole-market OI endpoint.
    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let Some(symbol) = symbol else {
            return Err(DataError::TickersRequired);
        };
        let url = format!("{HTTP_BASE_URL_BINANCE_FUTURES}/fapi/v1/openInterest");
        let query = vec![("symbol", symbol.to_string())];
        self.get(&url, &query).await
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BINANCE_SPOT}/api/v3/klines");
        let query = filter_params(&[
            ("symbol", Some(symbol.to_string())),
            ("interval", Some(timeframe.as_str().to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        self.get(&url, &query).await
    }

    async fn futures_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BINANCE_FUTURES}/fapi/v1/klines");
        let query = filter_params(&[
            ("symbol", Some(symbol.to_string())),
            ("interval", Some(timeframe.as_str().to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        self.get(&url, &query).await
    }

    async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BINANCE_SPOT}/api/v3/depth");
        let query = filter_params(&[
            ("symbol", Some(symbol.to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        self.get(&url, &query).await
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.futures_ticker(None).await
    }
}
