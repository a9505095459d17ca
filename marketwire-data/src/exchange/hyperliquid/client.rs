use crate::{error::DataError, exchange::MarketClient};
use async_trait::async_trait;
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::RestClient;
use reqwest::{
    Method,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::{Value, json};

/// [`Hyperliquid`](super::Hyperliquid) info endpoint - every query is a POST with a typed body.
pub const HTTP_BASE_URL_HYPERLIQUID: &str = "https://api.hyperliquid.xyz/info";

/// Hyperliquid snapshot client. The `metaAndAssetCtxs` response carries mark price, funding,
/// open interest and daily volume for every perpetual at once, so every snapshot operation
/// rides on it.
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    rest: RestClient,
}

impl HyperliquidClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Perpetuals metadata and asset contexts, positionally aligned.
    ///
    /// See docs: <https://hyperliquid.gitbook.io/hyperliquid-docs/for-developers/api/info-endpoint/perpetuals>
    pub async fn meta_and_asset_ctxs(&self) -> Result<Value, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(self
            .rest
            .request(
                Method::POST,
                HTTP_BASE_URL_HYPERLIQUID,
                &[],
                Some(json!({"type": "metaAndAssetCtxs"})),
                Some(headers),
            )
            .await?)
    }
}

#[async_trait]
impl MarketClient for HyperliquidClient {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    async fn futures_ticker(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        self.meta_and_asset_ctxs().await
    }

    async fn funding_rate(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        self.meta_and_asset_ctxs().await
    }

    async fn open_interest(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        self.meta_and_asset_ctxs().await
    }

    async fn futures_last_price(&self) -> Result<Value, DataError> {
        self.meta_and_asset_ctxs().await
    }
}
