use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

/// [`Xt`](super::Xt) spot REST server base url.
pub const HTTP_BASE_URL_XT_SPOT: &str = "https://dapi.xt.com";

/// [`Xt`](super::Xt) futures REST server base url.
pub const HTTP_BASE_URL_XT_FUTURES: &str = "https://fapi.xt.com";

/// XT snapshot client.
#[derive(Debug, Clone)]
pub struct XtClient {
    rest: RestClient,
}

impl XtClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl MarketClient for XtClient {
    fn venue(&self) -> Venue {
        Venue::Xt
    }

    async fn ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_XT_SPOT}/v4/public/ticker/24h");
        let query = filter_params(&[("symbol", symbol.map(String::from))]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn futures_ticker(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_XT_FUTURES}/future/market/v1/public/q/tickers");
        Ok(self
            .rest
            .request(Method::GET, &url, &[], None, None)
            .await?)
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.futures_ticker(None).await
    }
}
