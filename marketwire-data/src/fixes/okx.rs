//! OKX reports SWAP sizes in contracts; `ctVal` from the public instruments catalogue is the
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

const INSTRUMENTS_URL: &str = "https://www.okx.com/api/v5/public/instruments";

/// Process-wide OKX SWAP contract table.
pub fn table() -> &'static ContractTable {
    static TABLE: OnceLock<ContractTable> = OnceLock::new();
    TABLE.get_or_init(|| ContractTable::new(Venue::Okx))
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
            INSTRUMENTS_URL,
            &[("instType", "SWAP".to_string())],
            None,
            None,
        )
        .await?;

    let instruments = response["data"].as_array().cloned().unwrap_or_default();
    Ok(instruments
        .iter()
        .filter_map(|instrument| {
            let inst_id = instrument.get("instId")?.as_str()?;
            let ct_val = value_as_f64(Venue::Okx, instrument.get("ctVal")?).ok()?;
            Some((SmolStr::new(inst_id), ct_val))
        })
        .collect())
}

/// Multiply the `sz` of every trade in a raw `trades-all` message by the contract size.
/// Unknown symbols are logged and left unchanged.
pub fn aggtrade_fix(mut raw: Value) -> Value {
    if let Some(trades) = raw.get_mut("data").and_then(Value::as_array_mut) {
        for trade in trades {
            let Some(inst_id) = trade.get("instId").and_then(Value::as_str) else {
                error!("okx trade without instId: {trade}");
                continue;
            };
            let Some(ct_val) = table().get(inst_id) else {
                missing_size(Venue::Okx, inst_id);
                continue;
            };
            match trade.get("sz").map(|sz| value_as_f64(Venue::Okx, sz)) {
                Some(Ok(sz)) => {
                    trade["sz"] = Value::String((sz * ct_val).to_string());
                }
                _ => error!("can not fix okx trade size: {trade}"),
            }
        }
    }
    raw
}

/// Multiply the `oi` of every row in a raw open-interest response by the contract size.
pub fn open_interest_fix(mut raw: Value) -> Value {
    if let Some(rows) = raw.get_mut("data").and_then(Value::as_array_mut) {
        for row in rows {
            let Some(inst_id) = row.get("instId").and_then(Value::as_str) else {
                error!("okx open interest without instId: {row}");
                continue;
            };
            let Some(ct_val) = table().get(inst_id) else {
                missing_size(Venue::Okx, inst_id);
                continue;
            };
            match row.get("oi").map(|oi| value_as_f64(Venue::Okx, oi)) {
                Some(Ok(oi)) => {
                    row["oi"] = Value::String((oi * ct_val).to_string());
                }
                _ => error!("can not fix okx open interest: {row}"),
            }
        }
    }
    raw
}

/// Rewrite `vol24h` of every ticker row as `volCcy24h x last`.
///
/// OKX publishes `vol24h` in contracts and `volCcy24h` in the contract currency; the product
/// with the last price lands in quote-currency terms, which is what the 24h summary stores.
pub fn ticker_daily_fix(mut raw: Value) -> Value {
    if let Some(rows) = raw.get_mut("data").and_then(Value::as_array_mut) {
        for row in rows {
            let vol_ccy = row.get("volCcy24h").map(|v| value_as_f64(Venue::Okx, v));
            let last = row.get("last").map(|v| value_as_f64(Venue::Okx, v));
            match (vol_ccy, last) {
                (Some(Ok(vol_ccy)), Some(Ok(last))) => {
                    row["vol24h"] = Value::String((vol_ccy * last).to_string());
                }
                _ => error!("can not fix okx ticker daily: {row}"),
            }
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::VenueAdapter;
    use crate::exchange::okx::Okx;
    use marketwire_instrument::Side;
    use serde_json::json;

    #[test]
    fn test_okx_aggtrade_fix_multiplies_contract_size() {
        table().insert(SmolStr::new("BTC-USDT-SWAP"), 0.01);

        let raw = json!({
            "data": [{"instId": "BTC-USDT-SWAP", "sz": "5", "px": "30000",
                      "side": "buy", "ts": "1700000000000"}]
        });

        let fixed = aggtrade_fix(raw);
        assert_eq!(fixed["data"][0]["sz"], "0.05");

        // And the adapter then yields base units
        let trades = Okx.aggtrades_message(&fixed).unwrap();
        assert_eq!(trades[0].amount, 0.05);
        assert_eq!(trades[0].price, 30000.0);
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].time, 1700000000000);
    }

    #[test]
    fn test_okx_aggtrade_fix_unknown_symbol_unchanged() {
        let raw = json!({
            "data": [{"instId": "UNLISTED-USDT-SWAP", "sz": "5", "px": "1",
                      "side": "sell", "ts": "1700000000000"}]
        });

        let fixed = aggtrade_fix(raw.clone());
        assert_eq!(fixed, raw);
    }

    #[test]
    fn test_okx_ticker_daily_fix_rebases_volume() {
        let raw = json!({
            "data": [{"instId": "BTC-USDT-SWAP", "last": "104690", "open24h": "104492.9",
                      "volCcy24h": "99054.5377", "vol24h": "9905453.77"}]
        });

        let fixed = ticker_daily_fix(raw);
        let vol = fixed["data"][0]["vol24h"].as_str().unwrap();
        assert_eq!(vol.parse::<f64>().unwrap(), 99054.5377 * 104690.0);
    }
}
