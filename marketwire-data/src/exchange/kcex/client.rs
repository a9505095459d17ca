use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

/// [`Kcex`](super::Kcex) futures REST server base url.
pub const HTTP_BASE_URL_KCEX: &str = "https://www.kcex.com";

/// KCEX snapshot client - the contract ticker carries 24h statistics, funding rate, open
/// interest (`holdVol`, in contracts) and last price.
#[derive(Debug, Clone)]
pub struct KcexClient {
    rest: RestClient,
}

impl KcexClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    async fn contract_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_KCEX}/fapi/v1/contract/ticker");
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }
}

#[async_trait]
impl MarketClient for KcexClient {
    fn venue(&self) -> Venue {
        Venue::Kcex
    }

    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.contract_ticker(symbol).await
    }

    async fn funding_rate(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.contract_ticker(symbol).await
    }

    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.contract_ticker(symbol).await
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.contract_ticker(None).await
    }
}
