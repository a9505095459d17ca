use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

/// [`Gate`](super::Gate) REST server base url.
pub const HTTP_BASE_URL_GATE: &str = "https://api.gateio.ws/api/v4";

/// Gate snapshot client. Futures endpoints are parameterised by settle currency; this client
/// speaks the USDT-settled book.
#[derive(Debug, Clone)]
pub struct GateClient {
    rest: RestClient,
    settle: &'static str,
}

impl GateClient {
    pub fn new(rest: RestClient) -> Self {
        Self {
            rest,
            settle: "usdt",
        }
    }
}

#[async_trait]
impl MarketClient for GateClient {
    fn venue(&self) -> Venue {
        Venue::Gate
    }

    async fn ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_GATE}/spot/tickers");
        let query = filter_params(&[("currency_pair", symbol.map(String::from))]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_GATE}/futures/{}/tickers", self.settle);
        let query = filter_params(&[("contract", symbol.map(String::from))]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    /// Contract stats answer per contract and include open interest.
    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let Some(symbol) = symbol else {
            return Err(DataError::TickersRequired);
        };
        let url = format!("{HTTP_BASE_URL_GATE}/futures/{}/contract_stats", self.settle);
        let query = vec![("contract", symbol.to_string())];
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_GATE}/spot/order_book");
        let query = filter_params(&[
            ("currency_pair", Some(symbol.to_string())),
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
