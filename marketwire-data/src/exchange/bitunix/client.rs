use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

/// [`Bitunix`](super::Bitunix) futures REST server base url.
pub const HTTP_BASE_URL_BITUNIX_FUTURES: &str = "https://fapi.bitunix.com";

/// Bitunix snapshot client - futures tickers only.
#[derive(Debug, Clone)]
pub struct BitunixClient {
    rest: RestClient,
}

impl BitunixClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl MarketClient for BitunixClient {
    fn venue(&self) -> Venue {
        Venue::Bitunix
    }

    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_BITUNIX_FUTURES}/api/v1/futures/market/tickers");
        let query = filter_params(&[("symbols", symbol.map(String::from))]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.futures_ticker(None).await
    }
}
