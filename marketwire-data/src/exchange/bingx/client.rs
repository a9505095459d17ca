use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use chrono::Utc;
use marketwire_instrument::{Timeframe, Venue};
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

/// [`Bingx`](super::Bingx) REST server base url.
pub const HTTP_BASE_URL_BINGX: &str = "https://open-api.bingx.com";

/// BingX snapshot client. Every public endpoint wants a `timestamp` parameter.
#[derive(Debug, Clone)]
pub struct BingxClient {
    rest: RestClient,
}

impl BingxClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BINGX}{path}");
        let mut query = filter_params(params);
        query.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }
}

#[async_trait]
impl MarketClient for BingxClient {
    fn venue(&self) -> Venue {
        Venue::Bingx
    }

    async fn ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.get(
            "/openApi/spot/v1/ticker/24hr",
            &[("symbol", symbol.map(String::from))],
        )
        .await
    }

    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.get(
            "/openApi/swap/v2/quote/ticker",
            &[("symbol", symbol.map(String::from))],
        )
        .await
    }

    async fn funding_rate(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.get(
            "/openApi/swap/v2/quote/premiumIndex",
            &[("symbol", symbol.map(String::from))],
        )
        .await
    }

    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let Some(symbol) = symbol else {
            return Err(DataError::TickersRequired);
        };
        self.get(
            "/openApi/swap/v2/quote/openInterest",
            &[("symbol", Some(symbol.to_string()))],
        )
        .await
    }

    async fn futures_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        self.get(
            "/openApi/swap/v3/quote/klines",
            &[
                ("symbol", Some(symbol.to_string())),
                ("interval", Some(timeframe.as_str().to_string())),
                ("limit", limit.map(|limit| limit.to_string())),
            ],
        )
        .await
    }

    async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Value, DataError> {
        self.get(
            "/openApi/spot/v1/market/depth",
            &[
                ("symbol", Some(symbol.to_string())),
                ("limit", limit.map(|limit| limit.to_string())),
            ],
        )
        .await
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.futures_ticker(None).await
    }
}
