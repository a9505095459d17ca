use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, Depth, Kline, OpenInterest, TickerDaily},
};
use marketwire_instrument::{Side, Venue};
use marketwire_integration::de::de_str;
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;
use tracing::warn;

use super::Bitget;

/// Bitget REST envelope: `{"code":"00000","msg":"success","data": ...}`.
#[derive(Clone, Debug, Deserialize)]
struct BitgetData<T> {
    data: T,
}

/// v2 ticker row shared by the spot and USDT-futures endpoints.
///
/// ### Raw Payload Examples
/// See docs: <https://www.bitget.com/api-doc/spot/market/Get-Tickers>
/// ```json
/// {"symbol":"BTCUSDT","change24h":"0.0123","usdtVolume":"30000000","lastPr":"30000", ...}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BitgetTicker {
    symbol: SmolStr,
    #[serde(rename = "change24h", deserialize_with = "de_str")]
    change_24h: f64,
    #[serde(rename = "usdtVolume", deserialize_with = "de_str")]
    usdt_volume: f64,
    #[serde(rename = "lastPr", default, deserialize_with = "de_opt_str")]
    last_price: Option<f64>,
}

fn de_opt_str<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

#[derive(Clone, Debug, Deserialize)]
struct BitgetFundingRate {
    symbol: SmolStr,
    #[serde(rename = "fundingRate", deserialize_with = "de_str")]
    funding_rate: f64,
}

/// ```json
/// {"data":{"openInterestList":[{"symbol":"BTCUSDT","size":"34278.06"}],"ts":"1695796781616"}}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BitgetOpenInterestData {
    #[serde(rename = "openInterestList")]
    open_interest_list: Vec<BitgetOpenInterestRow>,
    #[serde(deserialize_with = "de_str")]
    ts: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct BitgetOpenInterestRow {
    symbol: SmolStr,
    #[serde(deserialize_with = "de_str")]
    size: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct BitgetStreamMessage<T> {
    arg: BitgetStreamArg,
    data: Vec<T>,
}

#[derive(Clone, Debug, Deserialize)]
struct BitgetStreamArg {
    channel: String,
    #[serde(rename = "instId")]
    inst_id: SmolStr,
}

/// ### Raw Payload Examples
/// See docs: <https://www.bitget.com/api-doc/spot/websocket/public/Trades-Channel>
/// ```json
/// {"arg":{"instType":"SPOT","channel":"trade","instId":"BTCUSDT"},
///  "data":[{"ts":"1700000000000","price":"30000.1","size":"0.05","side":"buy"}]}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BitgetTrade {
    #[serde(deserialize_with = "de_str")]
    ts: i64,
    #[serde(deserialize_with = "de_str")]
    price: f64,
    #[serde(deserialize_with = "de_str")]
    size: f64,
    side: Side,
}

/// Candle row: `[ts, open, high, low, close, baseVolume, usdtVolume, quoteVolume]` - column 6
/// carries the USDT volume.
#[derive(Clone, Debug, Deserialize)]
struct BitgetCandleRow(
    #[serde(deserialize_with = "de_str")] i64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(default)] Option<Value>,
);

impl VenueAdapter for Bitget {
    fn venue(&self) -> Venue {
        Venue::Bitget
    }

    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: BitgetData<Vec<BitgetTicker>> = from_raw(Venue::Bitget, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|ticker| ticker.symbol)
            .filter(|symbol| !only_usdt || symbol.ends_with("USDT"))
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
        let response: BitgetData<Vec<BitgetTicker>> = from_raw(Venue::Bitget, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter(|ticker| !only_usdt || ticker.symbol.ends_with("USDT"))
            .map(|ticker| {
                (
                    ticker.symbol,
                    // change24h is a fraction; volume is truncated to whole USDT
                    TickerDaily::from_fraction(ticker.change_24h, ticker.usdt_volume.trunc()),
                )
            })
            .collect())
    }

    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        self.ticker_24h(raw, only_usdt)
    }

    /// Accepts both one funding-rate response and a batched array of per-symbol responses.
    fn funding_rate(&self, raw: &Value, _only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        let responses: Vec<BitgetData<Vec<BitgetFundingRate>>> = if raw.is_array() {
            from_raw(Venue::Bitget, raw)?
        } else {
            vec![from_raw(Venue::Bitget, raw)?]
        };

        responses
            .into_iter()
            .map(|response| {
                let row = response.data.into_iter().next().ok_or_else(|| {
                    AdaptError::new(Venue::Bitget, "funding rate response with empty data")
                })?;
                Ok((row.symbol, row.funding_rate * 100.0))
            })
            .collect()
    }

    /// Accepts both one open-interest response and a batched array of per-symbol responses;
    /// batched items with an empty list are logged and skipped.
    fn open_interest(&self, raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        let responses: Vec<BitgetData<BitgetOpenInterestData>> = if raw.is_array() {
            from_raw(Venue::Bitget, raw)?
        } else {
            vec![from_raw(Venue::Bitget, raw)?]
        };

        Ok(responses
            .into_iter()
            .filter_map(|response| {
                let ts = response.data.ts;
                match response.data.open_interest_list.into_iter().next() {
                    Some(row) => Some((
                        row.symbol,
                        OpenInterest {
                            time: ts,
                            value: row.size,
                        },
                    )),
                    None => {
                        warn!(ts, "bitget open interest item with empty data");
                        None
                    }
                }
            })
            .collect())
    }

    fn kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        let response: BitgetData<Vec<BitgetCandleRow>> = from_raw(Venue::Bitget, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|row| Kline {
                symbol: SmolStr::default(),
                open_time: row.0,
                open: row.1,
                high: row.2,
                low: row.3,
                close: row.4,
                quote_volume: row.6,
                interval: None,
                close_time: None,
                closed: None,
            })
            .collect())
    }

    fn futures_kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        self.kline(raw)
    }

    fn kline_message(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        let message: BitgetStreamMessage<BitgetCandleRow> = from_raw(Venue::Bitget, raw)?;
        let interval = SmolStr::new(message.arg.channel.trim_start_matches("candle"));

        Ok(message
            .data
            .into_iter()
            .map(|row| Kline {
                symbol: message.arg.inst_id.clone(),
                open_time: row.0,
                open: row.1,
                high: row.2,
                low: row.3,
                close: row.4,
                quote_volume: row.6,
                interval: Some(interval.clone()),
                close_time: None,
                closed: None,
            })
            .collect())
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let message: BitgetStreamMessage<BitgetTrade> = from_raw(Venue::Bitget, raw)?;
        Ok(message
            .data
            .into_iter()
            .map(|trade| AggTrade {
                time: trade.ts,
                symbol: message.arg.inst_id.clone(),
                side: trade.side,
                price: trade.price,
                amount: trade.size,
            })
            .collect())
    }

    fn depth(&self, raw: &Value) -> Result<Depth, AdaptError> {
        let data = &raw["data"];
        Depth::from_raw_levels(Venue::Bitget, &data["asks"], &data["bids"])
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        let response: BitgetData<Vec<BitgetTicker>> = from_raw(Venue::Bitget, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter_map(|ticker| ticker.last_price.map(|price| (ticker.symbol, price)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bitget_ticker_24h() {
        let raw = json!({
            "code": "00000",
            "data": [
                {"symbol": "BTCUSDT", "change24h": "0.0123", "usdtVolume": "30000000.9",
                 "lastPr": "30000"},
                {"symbol": "BTCEUR", "change24h": "0.01", "usdtVolume": "1", "lastPr": "1"}
            ]
        });

        let actual = Bitget.ticker_24h(&raw, true).unwrap();

        assert_eq!(actual.len(), 1);
        assert_eq!(
            actual[&SmolStr::new("BTCUSDT")],
            TickerDaily {
                change_pct: 1.23,
                quote_volume: 30000000.0,
            }
        );
    }

    #[test]
    fn test_bitget_open_interest_batched_with_empty_item() {
        let raw = json!([
            {"data": {"openInterestList": [{"symbol": "BTCUSDT", "size": "34278.06"}],
                      "ts": "1695796781616"}},
            {"data": {"openInterestList": [], "ts": "1695796781616"}}
        ]);

        let actual = Bitget.open_interest(&raw).unwrap();

        assert_eq!(actual.len(), 1);
        assert_eq!(
            actual[&SmolStr::new("BTCUSDT")],
            OpenInterest {
                time: 1695796781616,
                value: 34278.06,
            }
        );
    }

    #[test]
    fn test_bitget_aggtrades_message() {
        let raw = json!({
            "arg": {"instType": "SPOT", "channel": "trade", "instId": "BTCUSDT"},
            "data": [{"ts": "1700000000000", "price": "30000.1", "size": "0.05",
                      "side": "sell"}]
        });

        let actual = Bitget.aggtrades_message(&raw).unwrap();
        assert_eq!(actual[0].side, Side::Sell);
        assert_eq!(actual[0].symbol, SmolStr::new("BTCUSDT"));
    }

    #[test]
    fn test_bitget_kline_message_interval() {
        let raw = json!({
            "arg": {"instType": "SPOT", "channel": "candle1H", "instId": "BTCUSDT"},
            "data": [["1700000000000", "10", "11", "9", "10.5", "55", "1234.5", "1234.5"]]
        });

        let actual = Bitget.kline_message(&raw).unwrap();
        assert_eq!(actual[0].interval, Some(SmolStr::new("1H")));
        assert_eq!(actual[0].quote_volume, 1234.5);
    }
}
