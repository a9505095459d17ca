use crate::{error::DataError, exchange::MarketClient, exchange::interval_token};
use async_trait::async_trait;
use marketwire_instrument::{Timeframe, Venue};
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

use super::INTERVALS;

/// [`Bitget`](super::Bitget) REST server base url. Responses carry `{"data": ...}` wrappers.
pub const HTTP_BASE_URL_BITGET: &str = "https://api.bitget.com";

const PRODUCT_TYPE_USDT_FUTURES: &str = "USDT-FUTURES";

/// Bitget snapshot client.
#[derive(Debug, Clone)]
pub struct BitgetClient {
    rest: RestClient,
}

impl BitgetClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BITGET}{path}");
        Ok(self
            .rest
            .request(Method::GET, &url, query, None, None)
            .await?)
    }
}

#[async_trait]
impl MarketClient for BitgetClient {
    fn venue(&self) -> Venue {
        Venue::Bitget
    }

    async fn ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        self.get("/api/v2/spot/market/tickers", &query).await
    }

    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let query = filter_params(&[
            ("productType", Some(PRODUCT_TYPE_USDT_FUTURES.to_string())),
            ("symbol", symbol.map(String::from)),
        ]);
        self.get("/api/v2/mix/market/tickers", &query).await
    }

    /// Funding rate answers per symbol.
    async fn funding_rate(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let Some(symbol) = symbol else {
            return Err(DataError::TickersRequired);
        };
        let query = vec![
            ("symbol", symbol.to_string()),
            ("productType", PRODUCT_TYPE_USDT_FUTURES.to_string()),
        ];
        self.get("/api/v2/mix/market/current-fund-rate", &query)
            .await
    }

    /// Open interest answers per symbol as `{"data":{"openInterestList":[...],"ts":...}}`.
    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let Some(symbol) = symbol else {
            return Err(DataError::TickersRequired);
        };
        let query = vec![
            ("symbol", symbol.to_string()),
            ("productType", PRODUCT_TYPE_USDT_FUTURES.to_string()),
        ];
        self.get("/api/v2/mix/market/open-interest", &query).await
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        let token = interval_token(Venue::Bitget, INTERVALS, timeframe)?;
        let query = filter_params(&[
            ("symbol", Some(symbol.to_string())),
            ("granularity", Some(token.to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        self.get("/api/v2/spot/market/candles", &query).await
    }

    async fn futures_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        let token = interval_token(Venue::Bitget, INTERVALS, timeframe)?;
        let query = filter_params(&[
            ("symbol", Some(symbol.to_string())),
            ("productType", Some(PRODUCT_TYPE_USDT_FUTURES.to_string())),
            ("granularity", Some(token.to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        self.get("/api/v2/mix/market/candles", &query).await
    }

    async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Value, DataError> {
        let query = filter_params(&[
            ("symbol", Some(symbol.to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        self.get("/api/v2/spot/market/orderbook", &query).await
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.futures_ticker(None).await
    }
}
