use crate::{error::DataError, exchange::MarketClient, exchange::interval_token};
use async_trait::async_trait;
use marketwire_instrument::{Timeframe, Venue};
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

use super::INTERVALS;

/// [`Okx`](super::Okx) REST server base url.
pub const HTTP_BASE_URL_OKX: &str = "https://www.okx.com";

/// OKX snapshot client. Responses arrive wrapped as `{"code":"0","data":[...]}`.
#[derive(Debug, Clone)]
pub struct OkxClient {
    rest: RestClient,
}

impl OkxClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    async fn tickers_by_inst_type(&self, inst_type: &str) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_OKX}/api/v5/market/tickers");
        let query = vec![("instType", inst_type.to_string())];
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }
}

#[async_trait]
impl MarketClient for OkxClient {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    async fn ticker(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        self.tickers_by_inst_type("SPOT").await
    }

    async fn futures_ticker(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        self.tickers_by_inst_type("SWAP").await
    }

    /// Funding rate answers per instrument - pass `BTC-USDT-SWAP` style ids.
    async fn funding_rate(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let Some(symbol) = symbol else {
            return Err(DataError::TickersRequired);
        };
        let url = format!("{HTTP_BASE_URL_OKX}/api/v5/public/funding-rate");
        let query = vec![("instId", symbol.to_string())];
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    /// Whole-SWAP open interest; sizes are in contracts until the contract-size fix runs.
    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_OKX}/api/v5/public/open-interest");
        let query = filter_params(&[
            ("instType", Some("SWAP".to_string())),
            ("instId", symbol.map(String::from)),
        ]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        let token = interval_token(Venue::Okx, INTERVALS, timeframe)?;
        let url = format!("{HTTP_BASE_URL_OKX}/api/v5/market/candles");
        let query = filter_params(&[
            ("instId", Some(symbol.to_string())),
            ("bar", Some(token.to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn futures_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        // Same candles endpoint; SWAP instruments are addressed by their instId
        self.klines(symbol, timeframe, limit).await
    }

    async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_OKX}/api/v5/market/books");
        let query = filter_params(&[
            ("instId", Some(symbol.to_string())),
            ("sz", limit.map(|limit| limit.to_string())),
        ]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.tickers_by_inst_type("SWAP").await
    }
}
