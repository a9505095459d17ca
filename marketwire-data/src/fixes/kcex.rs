//! KCEX futures report sizes in contracts; `cs` from the contract catalogue is the base-asset
//! value of one contract.
//!
//! Open interest is rebased to base units here (`holdVol x cs`); the dollar-denominated form
//! some consumers derived from `holdVol x lastPrice` contradicts the open-interest invariant
//! and is not produced.

use super::{ContractTable, DEFAULT_READY_TIMEOUT, missing_size};
use crate::{error::DataError, records::value_as_f64};
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::RestClient;
use reqwest::Method;
use serde_json::Value;
use smol_str::SmolStr;
use std::sync::OnceLock;
use tracing::error;

const CONTRACT_DETAIL_URL: &str = "https://www.kcex.com/fapi/v1/contract/detailV2";

/// Process-wide KCEX futures contract table.
pub fn table() -> &'static ContractTable {
    static TABLE: OnceLock<ContractTable> = OnceLock::new();
    TABLE.get_or_init(|| ContractTable::new(Venue::Kcex))
}

/// Spawn the refresh task (idempotent) and block until the table is populated.
pub async fn init() -> Result<(), DataError> {
    table().spawn_refresh(fetch_contract_sizes);
    table().wait_ready(DEFAULT_READY_TIMEOUT).await
}

async fn fetch_contract_sizes() -> Result<Vec<(SmolStr, f64)>, DataError> {
    let rest = RestClient::default();
    let response = rest
        .request(
            Method::GET,
            CONTRACT_DETAIL_URL,
            &[("client", "web".to_string())],
            None,
            None,
        )
        .await?;

    let contracts = response["data"].as_array().cloned().unwrap_or_default();
    Ok(contracts
        .iter()
        .filter_map(|contract| {
            let symbol = contract.get("symbol")?.as_str()?;
            let size = value_as_f64(Venue::Kcex, contract.get("cs")?).ok()?;
            Some((SmolStr::new(symbol), size))
        })
        .collect())
}

/// Multiply the `v` of every deal in a raw `push.deal` message by the contract size.
pub fn aggtrade_fix(mut raw: Value) -> Value {
    let Some(symbol) = raw.get("symbol").and_then(Value::as_str).map(String::from) else {
        error!("kcex deal without symbol: {raw}");
        return raw;
    };
    let Some(size) = table().get(&symbol) else {
        missing_size(Venue::Kcex, &symbol);
        return raw;
    };

    if let Some(deals) = raw.get_mut("data").and_then(Value::as_array_mut) {
        for deal in deals {
            match deal.get("v").map(|v| value_as_f64(Venue::Kcex, v)) {
                Some(Ok(amount)) => {
                    deal["v"] = Value::from(amount * size);
                }
                _ => error!("can not fix kcex deal: {deal}"),
            }
        }
    }
    raw
}

/// Multiply the `holdVol` of every contract-ticker row by the contract size, landing open
/// interest in base units.
pub fn open_interest_fix(mut raw: Value) -> Value {
    let Some(rows) = raw.get_mut("data").and_then(Value::as_array_mut) else {
        return raw;
    };
    for row in rows {
        let Some(symbol) = row.get("symbol").and_then(Value::as_str).map(String::from) else {
            error!("kcex ticker without symbol: {row}");
            continue;
        };
        let Some(size) = table().get(&symbol) else {
            missing_size(Venue::Kcex, &symbol);
            continue;
        };
        match row.get("holdVol").map(|v| value_as_f64(Venue::Kcex, v)) {
            Some(Ok(amount)) => {
                row["holdVol"] = Value::from(amount * size);
            }
            _ => error!("can not fix kcex open interest: {row}"),
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::VenueAdapter;
    use crate::exchange::kcex::Kcex;
    use serde_json::json;

    #[test]
    fn test_kcex_open_interest_fix_lands_base_units() {
        table().insert(SmolStr::new("BTC_USDT"), 0.0001);

        let raw = json!({
            "data": [{"symbol": "BTC_USDT", "lastPrice": 30000.0, "holdVol": 253676226.0,
                      "timestamp": 1748014472368i64}]
        });

        let fixed = open_interest_fix(raw);
        let oi = Kcex.open_interest(&fixed).unwrap();

        // holdVol x cs, never holdVol x lastPrice
        let expected = 253676226.0 * 0.0001;
        assert_eq!(oi[&smol_str::SmolStr::new("BTC_USDT")].value, expected);
    }
}
