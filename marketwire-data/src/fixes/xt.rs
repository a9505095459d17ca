//! XT futures report sizes in contracts; `contractSize` from the symbol catalogue is the
//! base-asset value of one contract.

use super::{ContractTable, DEFAULT_READY_TIMEOUT, missing_size};
use crate::{error::DataError, records::value_as_f64};
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::RestClient;
use reqwest::Method;
use serde_json::Value;
use smol_str::SmolStr;
use std::sync::OnceLock;
use tracing::error;

const SYMBOL_LIST_URL: &str = "https://fapi.xt.com/future/market/v3/public/symbol/list";

/// Process-wide XT futures contract table.
pub fn table() -> &'static ContractTable {
    static TABLE: OnceLock<ContractTable> = OnceLock::new();
    TABLE.get_or_init(|| ContractTable::new(Venue::Xt))
}

/// Spawn the refresh task (idempotent) and block until the table is populated.
pub async fn init() -> Result<(), DataError> {
    table().spawn_refresh(fetch_contract_sizes);
    table().wait_ready(DEFAULT_READY_TIMEOUT).await
}

async fn fetch_contract_sizes() -> Result<Vec<(SmolStr, f64)>, DataError> {
    let rest = RestClient::default();
    let response = rest
        .request(Method::GET, SYMBOL_LIST_URL, &[], None, None)
        .await?;

    let symbols = response["result"]["symbols"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    Ok(symbols
        .iter()
        .filter_map(|row| {
            let symbol = row.get("symbol")?.as_str()?;
            let size = value_as_f64(Venue::Xt, row.get("contractSize")?).ok()?;
            Some((SmolStr::new(symbol), size))
        })
        .collect())
}

/// Multiply the `a` (amount) of a raw futures trade message by the contract size.
pub fn aggtrade_fix(mut raw: Value) -> Value {
    let Some(symbol) = raw
        .get("data")
        .and_then(|data| data.get("s"))
        .and_then(Value::as_str)
        .map(String::from)
    else {
        error!("xt trade without symbol: {raw}");
        return raw;
    };
    let Some(size) = table().get(&symbol) else {
        missing_size(Venue::Xt, &symbol);
        return raw;
    };

    match raw
        .get("data")
        .and_then(|data| data.get("a"))
        .map(|a| value_as_f64(Venue::Xt, a))
    {
        Some(Ok(amount)) => {
            raw["data"]["a"] = Value::String((amount * size).to_string());
        }
        _ => error!("can not fix xt trade: {raw}"),
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_xt_aggtrade_fix() {
        table().insert(SmolStr::new("btc_usdt"), 0.001);

        let raw = json!({
            "topic": "trade",
            "data": {"s": "btc_usdt", "t": 1700000000000i64, "p": "30000.1",
                     "m": "BID", "a": "50"}
        });

        let fixed = aggtrade_fix(raw);
        assert_eq!(fixed["data"]["a"], "0.05");
    }
}
