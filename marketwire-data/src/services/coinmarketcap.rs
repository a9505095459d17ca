use crate::error::{AdaptError, DataError};
use fnv::FnvHashMap;
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::{RestClient, filter_params};
use reqwest::{
    Method,
    header::{HeaderMap, HeaderValue},
};
use serde_json::Value;
use smol_str::SmolStr;

/// Coinmarketcap pro API base url.
pub const HTTP_BASE_URL_COINMARKETCAP: &str = "https://pro-api.coinmarketcap.com";

/// Coinmarketcap client - authenticates every request with the `X-CMC_PRO_API_KEY` header.
#[derive(Debug, Clone)]
pub struct CoinmarketcapClient {
    rest: RestClient,
    api_key: String,
}

impl CoinmarketcapClient {
    pub fn new(rest: RestClient, api_key: String) -> Self {
        Self { rest, api_key }
    }

    fn headers(&self) -> Result<HeaderMap, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accepts", HeaderValue::from_static("application/json"));
        headers.insert(
            "X-CMC_PRO_API_KEY",
            HeaderValue::from_str(&self.api_key)
                .map_err(|error| DataError::Socket(error.to_string()))?,
        );
        Ok(headers)
    }

    /// Active cryptocurrency map, ranked by CMC rank.
    ///
    /// See docs: <https://coinmarketcap.com/api/documentation/v1/#operation/getV1CryptocurrencyMap>
    pub async fn cryptocurrency_map(
        &self,
        symbol: Option<&str>,
        start: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Value, DataError> {
        let url = format!("{HTTP_BASE_URL_COINMARKETCAP}/v1/cryptocurrency/map");
        let query = filter_params(&[
            ("sort", Some("cmc_rank".to_string())),
            ("symbol", symbol.map(String::from)),
            (
                "aux",
                Some("platform,first_historical_data,last_historical_data,is_active".to_string()),
            ),
            ("listing_status", Some("active".to_string())),
            ("start", Some(start.unwrap_or(1).to_string())),
            ("limit", Some(limit.unwrap_or(5000).to_string())),
        ]);

        Ok(self
            .rest
            .request(Method::GET, &url, &query, None, Some(self.headers()?))
            .await?)
    }
}

/// Reduce a cryptocurrency-map response to `{symbol -> cmc rank}`.
pub fn cryptocurrency_ranks(raw: &Value) -> Result<FnvHashMap<SmolStr, u32>, AdaptError> {
    let rows = raw["data"].as_array().ok_or_else(|| {
        AdaptError::new(
            Venue::Coinmarketcap,
            format!("cryptocurrency map without data: {raw}"),
        )
    })?;

    rows.iter()
        .map(|row| {
            let symbol = row
                .get("symbol")
                .and_then(Value::as_str)
                .ok_or_else(|| AdaptError::new(Venue::Coinmarketcap, "row without symbol"))?;
            let rank = row
                .get("rank")
                .and_then(Value::as_u64)
                .ok_or_else(|| AdaptError::new(Venue::Coinmarketcap, "row without rank"))?;
            Ok((SmolStr::new(symbol), rank as u32))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cryptocurrency_ranks() {
        let raw = json!({
            "data": [
                {"id": 1, "symbol": "BTC", "rank": 1},
                {"id": 1027, "symbol": "ETH", "rank": 2}
            ]
        });

        let actual = cryptocurrency_ranks(&raw).unwrap();
        assert_eq!(actual[&SmolStr::new("BTC")], 1);
        assert_eq!(actual[&SmolStr::new("ETH")], 2);

        assert!(cryptocurrency_ranks(&json!({"status": {}})).is_err());
    }
}
