use crate::{
    adapter::{SymbolMap, VenueAdapter},
    error::AdaptError,
    records::{AggTrade, Depth, Kline, OpenInterest, TickerDaily, value_as_f64},
};
use marketwire_instrument::{Side, Venue};
use serde_json::Value;
use smol_str::SmolStr;

use super::Bingx;

// BingX wraps most responses as {"code":0,"data":...}, but not all of them, and list
// payloads sometimes hide behind a "symbols" or "klines" key. The adapter navigates the
// Value directly instead of insisting on one wire shape.

fn unwrap_data(raw: &Value) -> &Value {
    raw.get("data").unwrap_or(raw)
}

fn rows(raw: &Value) -> Vec<&Value> {
    let data = unwrap_data(raw);
    if let Some(symbols) = data.get("symbols").and_then(Value::as_array) {
        return symbols.iter().collect();
    }
    match data.as_array() {
        Some(rows) => rows.iter().collect(),
        None => vec![data],
    }
}

fn symbol_of(row: &Value) -> Option<SmolStr> {
    row.get("symbol")
        .and_then(Value::as_str)
        .filter(|symbol| !symbol.is_empty())
        .map(SmolStr::new)
}

/// BingX symbols are `BTC-USDT` on both markets.
fn is_usdt(symbol: &str) -> bool {
    symbol.ends_with("USDT")
}

impl VenueAdapter for Bingx {
    fn venue(&self) -> Venue {
        Venue::Bingx
    }

    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        Ok(rows(raw)
            .into_iter()
            .filter_map(symbol_of)
            .filter(|symbol| !only_usdt || is_usdt(symbol))
            .collect())
    }

    fn futures_tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        self.tickers(raw, only_usdt)
    }

    fn ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let mut result = SymbolMap::default();
        for row in rows(raw) {
            let Some(symbol) = symbol_of(row) else {
                continue;
            };
            if only_usdt && !is_usdt(&symbol) {
                continue;
            }

            // priceChangePercent sometimes arrives suffixed with a literal '%'
            let change_pct = row
                .get("priceChangePercent")
                .map(|percent| match percent {
                    Value::String(s) => s.trim_end_matches('%').parse::<f64>().unwrap_or(0.0),
                    other => other.as_f64().unwrap_or(0.0),
                })
                .unwrap_or(0.0);

            let volume = row
                .get("quoteVolume")
                .or_else(|| row.get("volume"))
                .map(|volume| value_as_f64(Venue::Bingx, volume))
                .transpose()?
                .unwrap_or(0.0);

            result.insert(symbol, TickerDaily::new(change_pct, volume));
        }
        Ok(result)
    }

    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        self.ticker_24h(raw, only_usdt)
    }

    fn funding_rate(&self, raw: &Value, only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        let mut result = SymbolMap::default();
        for row in rows(raw) {
            let Some(symbol) = symbol_of(row) else {
                continue;
            };
            if only_usdt && !is_usdt(&symbol) {
                continue;
            }
            let Some(rate) = row
                .get("lastFundingRate")
                .or_else(|| row.get("fundingRate"))
                .filter(|rate| !rate.is_null() && rate.as_str() != Some(""))
            else {
                continue;
            };
            result.insert(symbol, value_as_f64(Venue::Bingx, rate)? * 100.0);
        }
        Ok(result)
    }

    fn open_interest(&self, raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        let mut result = SymbolMap::default();
        for row in rows(raw) {
            let Some(symbol) = symbol_of(row) else {
                continue;
            };
            let Some(value) = row
                .get("openInterest")
                .or_else(|| row.get("openInterestValue"))
                .filter(|value| !value.is_null() && value.as_str() != Some(""))
            else {
                continue;
            };
            let time = row
                .get("time")
                .or_else(|| row.get("timestamp"))
                .or_else(|| row.get("ts"))
                .and_then(Value::as_i64)
                .unwrap_or(0);

            result.insert(
                symbol,
                OpenInterest {
                    time,
                    value: value_as_f64(Venue::Bingx, value)?,
                },
            );
        }
        Ok(result)
    }

    fn kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        let data = unwrap_data(raw);
        let items = data.get("klines").unwrap_or(data);
        let items = items
            .as_array()
            .ok_or_else(|| AdaptError::new(Venue::Bingx, format!("klines not an array: {raw}")))?;
        let symbol = raw
            .get("symbol")
            .or_else(|| data.get("symbol"))
            .and_then(Value::as_str)
            .map(SmolStr::new)
            .unwrap_or_default();

        let mut klines = items
            .iter()
            .map(|row| {
                // Object rows ({"time":...,"open":...}) and column rows are both served
                if row.is_object() {
                    Ok(Kline {
                        symbol: symbol.clone(),
                        open_time: row
                            .get("time")
                            .and_then(Value::as_i64)
                            .ok_or_else(|| AdaptError::new(Venue::Bingx, "kline without time"))?,
                        open: value_as_f64(Venue::Bingx, &row["open"])?,
                        high: value_as_f64(Venue::Bingx, &row["high"])?,
                        low: value_as_f64(Venue::Bingx, &row["low"])?,
                        close: value_as_f64(Venue::Bingx, &row["close"])?,
                        quote_volume: value_as_f64(Venue::Bingx, &row["volume"])?,
                        interval: None,
                        close_time: None,
                        closed: None,
                    })
                } else {
                    let columns = row.as_array().filter(|columns| columns.len() >= 6).ok_or_else(
                        || AdaptError::new(Venue::Bingx, format!("malformed kline row: {row}")),
                    )?;
                    Ok(Kline {
                        symbol: symbol.clone(),
                        open_time: columns[0].as_i64().ok_or_else(|| {
                            AdaptError::new(Venue::Bingx, "kline without open time")
                        })?,
                        open: value_as_f64(Venue::Bingx, &columns[1])?,
                        high: value_as_f64(Venue::Bingx, &columns[2])?,
                        low: value_as_f64(Venue::Bingx, &columns[3])?,
                        close: value_as_f64(Venue::Bingx, &columns[4])?,
                        quote_volume: value_as_f64(Venue::Bingx, &columns[5])?,
                        interval: None,
                        close_time: columns.get(6).and_then(Value::as_i64),
                        closed: None,
                    })
                }
            })
            .collect::<Result<Vec<_>, AdaptError>>()?;

        klines.sort_by_key(|kline| kline.open_time);
        Ok(klines)
    }

    fn futures_kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        self.kline(raw)
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let trades = raw
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| AdaptError::new(Venue::Bingx, format!("trades not an array: {raw}")))?;

        let mut result = trades
            .iter()
            .map(|trade| {
                Ok(AggTrade {
                    time: trade
                        .get("T")
                        .and_then(Value::as_i64)
                        .ok_or_else(|| AdaptError::new(Venue::Bingx, "trade without time"))?,
                    symbol: trade
                        .get("s")
                        .and_then(Value::as_str)
                        .map(SmolStr::new)
                        .ok_or_else(|| AdaptError::new(Venue::Bingx, "trade without symbol"))?,
                    side: if trade.get("m").and_then(Value::as_bool).unwrap_or(false) {
                        Side::Sell
                    } else {
                        Side::Buy
                    },
                    price: value_as_f64(Venue::Bingx, &trade["p"])?,
                    amount: value_as_f64(Venue::Bingx, &trade["q"])?,
                })
            })
            .collect::<Result<Vec<_>, AdaptError>>()?;

        result.sort_by_key(|trade| trade.time);
        Ok(result)
    }

    fn depth(&self, raw: &Value) -> Result<Depth, AdaptError> {
        let data = unwrap_data(raw);
        let asks = data.get("asks").or_else(|| data.get("a"));
        let bids = data.get("bids").or_else(|| data.get("b"));
        match (asks, bids) {
            (Some(asks), Some(bids)) => Depth::from_raw_levels(Venue::Bingx, asks, bids),
            _ => Err(AdaptError::new(
                Venue::Bingx,
                format!("depth without ask/bid books: {raw}"),
            )),
        }
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        let mut result = SymbolMap::default();
        for row in rows(raw) {
            let Some(symbol) = symbol_of(row) else {
                continue;
            };
            let Some(price) = row.get("lastPrice").or_else(|| row.get("price")) else {
                continue;
            };
            result.insert(symbol, value_as_f64(Venue::Bingx, price)?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bingx_ticker_24h_percent_suffix() {
        let raw = json!({
            "code": 0,
            "data": [
                {"symbol": "BTC-USDT", "priceChangePercent": "1.2345%",
                 "quoteVolume": "30000000"},
                {"symbol": "ETH-USDT", "priceChangePercent": -0.5, "volume": "100"}
            ]
        });

        let actual = Bingx.ticker_24h(&raw, true).unwrap();

        assert_eq!(actual[&SmolStr::new("BTC-USDT")].change_pct, 1.23);
        assert_eq!(actual[&SmolStr::new("ETH-USDT")].change_pct, -0.5);
    }

    #[test]
    fn test_bingx_aggtrades_sorted_by_time() {
        let raw = json!({
            "dataType": "BTC-USDT@trade",
            "data": [
                {"T": 1700000000200i64, "s": "BTC-USDT", "m": true, "p": "30000.2", "q": "0.01"},
                {"T": 1700000000100i64, "s": "BTC-USDT", "m": false, "p": "30000.1", "q": "0.02"}
            ]
        });

        let actual = Bingx.aggtrades_message(&raw).unwrap();

        assert_eq!(actual[0].time, 1700000000100);
        assert_eq!(actual[0].side, Side::Buy);
        assert_eq!(actual[1].side, Side::Sell);
    }

    #[test]
    fn test_bingx_depth_accepts_both_key_styles() {
        let raw = json!({
            "data": {"asks": [["100", "1"]], "bids": [["99", "2"]]}
        });
        assert!(Bingx.depth(&raw).is_ok());

        let raw = json!({
            "data": {"a": [["100", "1"]], "b": [["99", "2"]]}
        });
        assert!(Bingx.depth(&raw).is_ok());

        let raw = json!({"data": {}});
        assert!(Bingx.depth(&raw).is_err());
    }
}
