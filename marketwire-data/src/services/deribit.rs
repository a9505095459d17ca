use crate::error::DataError;
use chrono::Utc;
use marketwire_integration::protocol::http::RestClient;
use parking_lot::Mutex;
use reqwest::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::{Value, json};

/// Deribit JSON-RPC base url.
pub const HTTP_BASE_URL_DERIBIT: &str = "https://www.deribit.com/api/v2";

/// Cached OAuth access token with its expiry instant (epoch seconds).
#[derive(Debug, Default, Clone)]
struct AccessToken {
    token: String,
    expires_at: i64,
}

/// Deribit JSON-RPC client using OAuth client-credentials.
///
/// The access token is refreshed lazily, one minute before its expiry.
#[derive(Debug)]
pub struct DeribitClient {
    rest: RestClient,
    client_id: String,
    client_secret: String,
    token: Mutex<AccessToken>,
}

impl DeribitClient {
    pub fn new(rest: RestClient, client_id: String, client_secret: String) -> Self {
        Self {
            rest,
            client_id,
            client_secret,
            token: Mutex::new(AccessToken::default()),
        }
    }

    async fn authenticate(&self) -> Result<String, DataError> {
        {
            let token = self.token.lock();
            if !token.token.is_empty() && Utc::now().timestamp() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let url = format!("{HTTP_BASE_URL_DERIBIT}/public/auth");
        let query = vec![
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
            ("grant_type", "client_credentials".to_string()),
        ];
        let response = self
            .rest
            .request(Method::GET, &url, &query, None, None)
            .await?;

        if let Some(error) = response.get("error") {
            return Err(DataError::Socket(format!(
                "deribit authentication error: {error}"
            )));
        }

        let access_token = response["result"]["access_token"]
            .as_str()
            .ok_or_else(|| DataError::Socket("deribit auth response without token".to_string()))?
            .to_string();
        let expires_in = response["result"]["expires_in"].as_i64().unwrap_or(0);

        let mut token = self.token.lock();
        token.token = access_token.clone();
        // Refresh a minute before the token actually lapses
        token.expires_at = Utc::now().timestamp() + expires_in - 60;

        Ok(access_token)
    }

    /// Execute one JSON-RPC method.
    pub async fn rpc(&self, method: &str, params: Value) -> Result<Value, DataError> {
        let token = self.authenticate().await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|error| DataError::Socket(error.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = json!({
            "jsonrpc": "2.0",
            "id": Utc::now().timestamp_millis(),
            "method": method,
            "params": params,
        });

        Ok(self
            .rest
            .request(
                Method::POST,
                HTTP_BASE_URL_DERIBIT,
                &[],
                Some(body),
                Some(headers),
            )
            .await?)
    }

    /// Current ticker state of one instrument.
    pub async fn ticker(&self, instrument_name: &str) -> Result<Value, DataError> {
        self.rpc("public/ticker", json!({"instrument_name": instrument_name}))
            .await
    }

    /// Order book of one instrument.
    pub async fn order_book(
        &self,
        instrument_name: &str,
        depth: Option<u32>,
    ) -> Result<Value, DataError> {
        self.rpc(
            "public/get_order_book",
            json!({
                "instrument_name": instrument_name,
                "depth": depth.unwrap_or(10),
            }),
        )
        .await
    }

    /// Static description of one instrument.
    pub async fn instrument(&self, instrument_name: &str) -> Result<Value, DataError> {
        self.rpc(
            "public/get_instrument",
            json!({"instrument_name": instrument_name}),
        )
        .await
    }

    /// All instruments of a currency, filtered by kind.
    pub async fn instruments(&self, currency: &str, kind: &str) -> Result<Value, DataError> {
        self.rpc(
            "public/get_instruments",
            json!({"currency": currency, "kind": kind}),
        )
        .await
    }
}
