use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, Depth, Kline, Liquidation, OpenInterest, TickerDaily},
};
use marketwire_instrument::{Side, Venue};
use marketwire_integration::de::de_str;
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use super::Bybit;

/// Bybit v5 REST envelope: `{"retCode":0,"result":{"list":[...]},"time":...}`.
#[derive(Clone, Debug, Deserialize)]
struct BybitResponse<T> {
    result: BybitResult<T>,
    #[serde(default)]
    time: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct BybitResult<T> {
    #[serde(default)]
    symbol: Option<SmolStr>,
    list: Vec<T>,
}

/// v5 tickers row - carries 24h statistics, funding rate and open interest for linear symbols.
///
/// ### Raw Payload Examples
/// See docs: <https://bybit-exchange.github.io/docs/v5/market/tickers>
/// ```json
/// {"symbol":"BTCUSDT","price24hPcnt":"0.0123","volume24h":"1000","turnover24h":"30000000",
///  "fundingRate":"0.0001","openInterest":"84548.99","lastPrice":"30000", ...}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BybitTickerRow {
    symbol: SmolStr,
    #[serde(rename = "price24hPcnt", default, deserialize_with = "de_opt_str")]
    price_24h_pcnt: Option<f64>,
    #[serde(rename = "turnover24h", default, deserialize_with = "de_opt_str")]
    turnover_24h: Option<f64>,
    #[serde(rename = "fundingRate", default, deserialize_with = "de_opt_str")]
    funding_rate: Option<f64>,
    #[serde(rename = "openInterest", default, deserialize_with = "de_opt_str")]
    open_interest: Option<f64>,
    #[serde(rename = "lastPrice", default, deserialize_with = "de_opt_str")]
    last_price: Option<f64>,
}

fn de_opt_str<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    // Bybit ships "" for fields a symbol does not have (eg/ funding on new listings)
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).and_then(|s| s.parse().ok()))
}

/// Streaming kline message.
///
/// ### Raw Payload Examples
/// See docs: <https://bybit-exchange.github.io/docs/v5/websocket/public/kline>
/// ```json
/// {"topic":"kline.1.BTCUSDT","data":[{"start":1700000000000,"end":1700000060000,
///  "interval":"1","open":"10","close":"10.5","high":"11","low":"9","volume":"55",
///  "turnover":"1234.5","confirm":false,"timestamp":1700000030000}]}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BybitKlineMessage {
    topic: String,
    data: Vec<BybitKlineData>,
}

#[derive(Clone, Debug, Deserialize)]
struct BybitKlineData {
    start: i64,
    end: i64,
    interval: SmolStr,
    #[serde(deserialize_with = "de_str")]
    open: f64,
    #[serde(deserialize_with = "de_str")]
    high: f64,
    #[serde(deserialize_with = "de_str")]
    low: f64,
    #[serde(deserialize_with = "de_str")]
    close: f64,
    #[serde(deserialize_with = "de_str")]
    turnover: f64,
    confirm: bool,
}

/// ### Raw Payload Examples
/// See docs: <https://bybit-exchange.github.io/docs/v5/websocket/public/trade>
/// ```json
/// {"topic":"publicTrade.BTCUSDT","data":[{"T":1700000000000,"s":"BTCUSDT","S":"Buy",
///  "v":"0.05","p":"30000.1","i":"...","BT":false}]}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BybitTradeMessage {
    data: Vec<BybitTrade>,
}

#[derive(Clone, Debug, Deserialize)]
struct BybitTrade {
    #[serde(rename = "T")]
    time: i64,
    #[serde(rename = "s")]
    symbol: SmolStr,
    #[serde(rename = "S")]
    side: Side,
    #[serde(rename = "p", deserialize_with = "de_str")]
    price: f64,
    #[serde(rename = "v", deserialize_with = "de_str")]
    amount: f64,
}

/// ### Raw Payload Examples
/// See docs: <https://bybit-exchange.github.io/docs/v5/websocket/public/liquidation>
/// ```json
/// {"topic":"liquidation.BTCUSDT","type":"snapshot","ts":1703485237953,
///  "data":{"updatedTime":1703485237953,"symbol":"BTCUSDT","side":"Sell",
///  "size":"0.003","price":"43511.70"}}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BybitLiquidationMessage {
    data: BybitLiquidationData,
}

#[derive(Clone, Debug, Deserialize)]
struct BybitLiquidationData {
    #[serde(rename = "updatedTime")]
    updated_time: i64,
    symbol: SmolStr,
    side: Side,
    #[serde(deserialize_with = "de_str")]
    size: f64,
    #[serde(deserialize_with = "de_str")]
    price: f64,
}

/// REST kline row: `[startTime, open, high, low, close, volume, turnover]`, newest first.
#[derive(Clone, Debug, Deserialize)]
struct BybitKlineRow(
    #[serde(deserialize_with = "de_str")] i64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
);

fn symbol_is_usdt(symbol: &str) -> bool {
    symbol.ends_with("USDT")
}

impl VenueAdapter for Bybit {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: BybitResponse<BybitTickerRow> = from_raw(Venue::Bybit, raw)?;
        Ok(response
            .result
            .list
            .into_iter()
            .map(|row| row.symbol)
            .filter(|symbol| !only_usdt || symbol_is_usdt(symbol))
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
        let response: BybitResponse<BybitTickerRow> = from_raw(Venue::Bybit, raw)?;
        Ok(response
            .result
            .list
            .into_iter()
            .filter(|row| !only_usdt || symbol_is_usdt(&row.symbol))
            .map(|row| {
                (
                    row.symbol,
                    TickerDaily::from_fraction(
                        row.price_24h_pcnt.unwrap_or_default(),
                        row.turnover_24h.unwrap_or_default(),
                    ),
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

    fn funding_rate(&self, raw: &Value, only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        let response: BybitResponse<BybitTickerRow> = from_raw(Venue::Bybit, raw)?;
        Ok(response
            .result
            .list
            .into_iter()
            .filter(|row| !only_usdt || symbol_is_usdt(&row.symbol))
            .filter_map(|row| {
                row.funding_rate
                    .map(|rate| (row.symbol, rate * 100.0))
            })
            .collect())
    }

    fn open_interest(&self, raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        let response: BybitResponse<BybitTickerRow> = from_raw(Venue::Bybit, raw)?;
        let time = response.time;
        Ok(response
            .result
            .list
            .into_iter()
            .filter_map(|row| {
                row.open_interest.map(|value| {
                    (
                        row.symbol,
                        OpenInterest { time, value },
                    )
                })
            })
            .collect())
    }

    fn kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        let response: BybitResponse<BybitKlineRow> = from_raw(Venue::Bybit, raw)?;
        let symbol = response.result.symbol.unwrap_or_default();
        Ok(response
            .result
            .list
            .into_iter()
            .map(|row| Kline {
                symbol: symbol.clone(),
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
        let message: BybitKlineMessage = from_raw(Venue::Bybit, raw)?;
        let symbol = topic_symbol(&message.topic)?;

        Ok(message
            .data
            .into_iter()
            .map(|bar| Kline {
                symbol: symbol.clone(),
                open_time: bar.start,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                quote_volume: bar.turnover,
                interval: Some(bar.interval),
                close_time: Some(bar.end),
                closed: Some(bar.confirm),
            })
            .collect())
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let message: BybitTradeMessage = from_raw(Venue::Bybit, raw)?;
        Ok(message
            .data
            .into_iter()
            .map(|trade| AggTrade {
                time: trade.time,
                symbol: trade.symbol,
                side: trade.side,
                price: trade.price,
                amount: trade.amount,
            })
            .collect())
    }

    fn liquidation_message(&self, raw: &Value) -> Result<Vec<Liquidation>, AdaptError> {
        let message: BybitLiquidationMessage = from_raw(Venue::Bybit, raw)?;
        let data = message.data;
        Ok(vec![Liquidation {
            time: data.updated_time,
            symbol: data.symbol,
            side: data.side,
            amount: data.size,
            price: data.price,
        }])
    }

    fn depth(&self, raw: &Value) -> Result<Depth, AdaptError> {
        let result = &raw["result"];
        Depth::from_raw_levels(Venue::Bybit, &result["a"], &result["b"])
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        let response: BybitResponse<BybitTickerRow> = from_raw(Venue::Bybit, raw)?;
        Ok(response
            .result
            .list
            .into_iter()
            .filter_map(|row| row.last_price.map(|price| (row.symbol, price)))
            .collect())
    }
}

/// Extract the symbol from a `kline.{interval}.{symbol}` style topic.
fn topic_symbol(topic: &str) -> Result<SmolStr, AdaptError> {
    topic
        .rsplit('.')
        .next()
        .filter(|symbol| !symbol.is_empty())
        .map(SmolStr::new)
        .ok_or_else(|| AdaptError::new(Venue::Bybit, format!("topic without symbol: {topic}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bybit_kline_message() {
        let raw = json!({
            "topic": "kline.1.BTCUSDT",
            "data": [{
                "start": 1700000000000i64, "end": 1700000060000i64, "open": "10",
                "high": "11", "low": "9", "close": "10.5", "turnover": "1234.5",
                "volume": "55", "confirm": false, "interval": "1",
                "timestamp": 1700000030000i64
            }]
        });

        let actual = Bybit.kline_message(&raw).unwrap();

        assert_eq!(
            actual,
            vec![Kline {
                symbol: SmolStr::new("BTCUSDT"),
                open_time: 1700000000000,
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                quote_volume: 1234.5,
                interval: Some(SmolStr::new("1")),
                close_time: Some(1700000060000),
                closed: Some(false),
            }]
        );
    }

    #[test]
    fn test_bybit_ticker_24h_scales_fraction() {
        let raw = json!({
            "retCode": 0,
            "result": {"category": "linear", "list": [
                {"symbol": "BTCUSDT", "price24hPcnt": "0.0123", "turnover24h": "30000000",
                 "volume24h": "1000", "fundingRate": "0.0001", "openInterest": "84548.99",
                 "lastPrice": "30000"},
                {"symbol": "BTCPERP", "price24hPcnt": "0.01", "turnover24h": "1",
                 "volume24h": "1", "fundingRate": "", "openInterest": "1", "lastPrice": "1"}
            ]},
            "time": 1700000000000i64
        });

        let actual = Bybit.futures_ticker_24h(&raw, true).unwrap();
        assert_eq!(actual.len(), 1);
        assert_eq!(
            actual[&SmolStr::new("BTCUSDT")],
            TickerDaily {
                change_pct: 1.23,
                quote_volume: 30000000.0,
            }
        );

        let funding = Bybit.funding_rate(&raw, true).unwrap();
        assert_eq!(funding[&SmolStr::new("BTCUSDT")], 0.01);

        let oi = Bybit.open_interest(&raw).unwrap();
        assert_eq!(
            oi[&SmolStr::new("BTCUSDT")],
            OpenInterest {
                time: 1700000000000,
                value: 84548.99,
            }
        );
    }

    #[test]
    fn test_bybit_liquidation_message() {
        let raw = json!({
            "topic": "liquidation.BTCUSDT", "type": "snapshot", "ts": 1703485237953i64,
            "data": {"updatedTime": 1703485237953i64, "symbol": "BTCUSDT", "side": "Sell",
                     "size": "0.003", "price": "43511.70"}
        });

        let actual = Bybit.liquidation_message(&raw).unwrap();
        assert_eq!(
            actual,
            vec![Liquidation {
                time: 1703485237953,
                symbol: SmolStr::new("BTCUSDT"),
                side: Side::Sell,
                amount: 0.003,
                price: 43511.70,
            }]
        );
    }
}
