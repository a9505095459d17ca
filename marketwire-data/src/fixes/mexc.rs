//! MEXC futures report sizes in contracts; `contractSize` from the contract catalogue is the
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

const CONTRACT_DETAIL_URL: &str = "https://contract.mexc.com/api/v1/contract/detail";

/// Process-wide MEXC futures contract table.
pub fn table() -> &'static ContractTable {
    static TABLE: OnceLock<ContractTable> = OnceLock::new();
    TABLE.get_or_init(|| ContractTable::new(Venue::Mexc))
}

/// Spawn the refresh task (idempotent) and block until the table is populated.
pub async fn init() -> Result<(), DataError> {
    table().spawn_refresh(fetch_contract_sizes);
    table().wait_ready(DEFAULT_READY_TIMEOUT).await
}

async fn fetch_contract_sizes() -> Result<Vec<(SmolStr, f64)>, DataError> {
    let rest = RestClient::default();
    let response = rest
        .request(Method::GET, CONTRACT_DETAIL_URL, &[], None, None)
        .await?;

    let contracts = response["data"].as_array().cloned().unwrap_or_default();
    Ok(contracts
        .iter()
        .filter_map(|contract| {
            let symbol = contract.get("symbol")?.as_str()?;
            let size = value_as_f64(Venue::Mexc, contract.get("contractSize")?).ok()?;
            Some((SmolStr::new(symbol), size))
        })
        .collect())
}

/// Multiply the `v` of a raw `push.deal` message by the contract size.
pub fn aggtrade_fix(mut raw: Value) -> Value {
    let Some(symbol) = raw.get("symbol").and_then(Value::as_str).map(String::from) else {
        error!("mexc deal without symbol: {raw}");
        return raw;
    };
    let Some(size) = table().get(&symbol) else {
        missing_size(Venue::Mexc, &symbol);
        return raw;
    };

    match raw
        .get("data")
        .and_then(|data| data.get("v"))
        .map(|v| value_as_f64(Venue::Mexc, v))
    {
        Some(Ok(amount)) => {
            raw["data"]["v"] = Value::from(amount * size);
        }
        _ => error!("can not fix mexc deal: {raw}"),
    }
    raw
}

/// Multiply the `volume24` of every contract-ticker row by the contract size.
pub fn ticker_daily_fix(mut raw: Value) -> Value {
    fix_rows(&mut raw, "volume24");
    raw
}

/// Multiply the `holdVol` of every contract-ticker row by the contract size.
pub fn open_interest_fix(mut raw: Value) -> Value {
    fix_rows(&mut raw, "holdVol");
    raw
}

fn fix_rows(raw: &mut Value, field: &str) {
    let Some(rows) = raw.get_mut("data").and_then(Value::as_array_mut) else {
        return;
    };
    for row in rows {
        let Some(symbol) = row.get("symbol").and_then(Value::as_str).map(String::from) else {
            error!("mexc ticker without symbol: {row}");
            continue;
        };
        let Some(size) = table().get(&symbol) else {
            missing_size(Venue::Mexc, &symbol);
            continue;
        };
        match row.get(field).map(|v| value_as_f64(Venue::Mexc, v)) {
            Some(Ok(amount)) => {
                row[field] = Value::from(amount * size);
            }
            _ => error!("can not fix mexc field {field}: {row}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mexc_fixes_scale_contract_fields() {
        table().insert(SmolStr::new("ETH_USDT"), 0.1);

        let deal = json!({
            "symbol": "ETH_USDT",
            "data": {"p": 2575.2, "v": 10.0, "T": 1, "t": 1748023214750i64},
            "channel": "push.deal"
        });
        let fixed = aggtrade_fix(deal);
        assert_eq!(fixed["data"]["v"], 1.0);

        let tickers = json!({
            "data": [{"symbol": "ETH_USDT", "volume24": 100.0, "holdVol": 50.0}]
        });
        let fixed = open_interest_fix(ticker_daily_fix(tickers));
        assert_eq!(fixed["data"][0]["volume24"], 10.0);
        assert_eq!(fixed["data"][0]["holdVol"], 5.0);
    }

    #[test]
    fn test_mexc_fix_unknown_symbol_unchanged() {
        let deal = json!({
            "symbol": "UNLISTED_USDT",
            "data": {"p": 1.0, "v": 10.0, "T": 1, "t": 1i64},
            "channel": "push.deal"
        });
        let fixed = aggtrade_fix(deal.clone());
        assert_eq!(fixed, deal);
    }
}
