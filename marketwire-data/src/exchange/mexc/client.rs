use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

/// [`Mexc`](super::Mexc) spot REST server base url.
pub const HTTP_BASE_URL_MEXC_SPOT: &str = "https://api.mexc.com";

/// [`Mexc`](super::Mexc) contract REST server base url.
pub const HTTP_BASE_URL_MEXC_FUTURES: &str = "https://contract.mexc.com";

/// MEXC snapshot client.
///
/// MEXC stopped serving a dedicated open-interest endpoint; `open_interest` rides on the
/// contract ticker, whose `holdVol` field carries OI in contracts until the contract-size
/// fix runs.
#[derive(Debug, Clone)]
pub struct MexcClient {
    rest: RestClient,
}

impl MexcClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl MarketClient for MexcClient {
    fn venue(&self) -> Venue {
        Venue::Mexc
    }

    async fn ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_MEXC_SPOT}/api/v3/ticker/24hr");
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_MEXC_FUTURES}/api/v1/contract/ticker");
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn funding_rate(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_MEXC_FUTURES}/api/v1/contract/funding_rate");
        Ok(self
            .rest
            .request(Method::GET, &url, &[], None, None)
            .await?)
    }

    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.futures_ticker(symbol).await
    }

    async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_MEXC_SPOT}/api/v3/depth");
        let query = filter_params(&[
            ("symbol", Some(symbol.to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.futures_ticker(None).await
    }
}
