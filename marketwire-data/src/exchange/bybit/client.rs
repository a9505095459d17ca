use crate::{error::DataError, exchange::MarketClient, exchange::interval_token};
use async_trait::async_trait;
use marketwire_instrument::{Timeframe, Venue};
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::Method;
use serde_json::Value;

use super::INTERVALS;

/// Bybit regional top-level domains. Bybit geo-fences its REST hosts; the Kazakhstan host is
/// the default.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum BybitTld {
    #[default]
    Kz,
    Nl,
    Tr,
    Hk,
    Testnet,
}

impl BybitTld {
    fn base_url(&self) -> &'static str {
        match self {
            BybitTld::Kz => "https://api.bybit.kz",
            BybitTld::Nl => "https://api.bybit.nl",
            BybitTld::Tr => "https://api.bybit-tr.com",
            BybitTld::Hk => "https://api.byhkbit.com",
            BybitTld::Testnet => "https://api-testnet.bybit.com",
        }
    }
}

/// Bybit snapshot client. Funding rate and open interest ride on the v5 tickers endpoint,
/// which reports both per linear symbol.
#[derive(Debug, Clone)]
pub struct BybitClient {
    rest: RestClient,
    tld: BybitTld,
}

impl BybitClient {
    pub fn new(rest: RestClient) -> Self {
        Self {
            rest,
            tld: BybitTld::default(),
        }
    }

    pub fn with_tld(mut self, tld: BybitTld) -> Self {
        self.tld = tld;
        self
    }

    async fn tickers_by_category(
        &self,
        category: &str,
        symbol: Option<&str>,
    ) -> Result<Value, DataError> {
        let url = format!("{}/v5/market/tickers", self.tld.base_url());
        let query = filter_params(&[
            ("category", Some(category.to_string())),
            ("symbol", symbol.map(String::from)),
        ]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }

    async fn klines_by_category(
        &self,
        category: &str,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        let token = interval_token(Venue::Bybit, INTERVALS, timeframe)?;
        let url = format!("{}/v5/market/kline", self.tld.base_url());
        let query = filter_params(&[
            ("category", Some(category.to_string())),
            ("symbol", Some(symbol.to_string())),
            ("interval", Some(token.to_string())),
            ("limit", limit.map(|limit| limit.to_string())),
        ]);
        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?)
    }
}

#[async_trait]
impl MarketClient for BybitClient {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    async fn ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.tickers_by_category("spot", symbol).await
    }

    async fn futures_ticker(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.tickers_by_category("linear", symbol).await
    }

    async fn funding_rate(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.tickers_by_category("linear", symbol).await
    }

    async fn open_interest(&self, symbol: Option<&str>) -> Result<Value, DataError> {
        self.tickers_by_category("linear", symbol).await
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        self.klines_by_category("spot", symbol, timeframe, limit)
            .await
    }

    async fn futures_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        self.klines_by_category("linear", symbol, timeframe, limit)
            .await
    }

    async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Value, DataError> {
        let url = format!("{}/v5/market/orderbook", self.tld.base_url());
        let query = filter_params(&[
            ("category", Some("spot".to_string())),
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
