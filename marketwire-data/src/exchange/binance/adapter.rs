use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, Depth, Kline, Liquidation, OpenInterest, TickerDaily},
};
use marketwire_instrument::{Side, Venue};
use marketwire_integration::de::{de_flexible_f64, de_str};
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use super::Binance;

/// Binance 24h statistics row, shared by the spot and futures endpoints.
///
/// ### Raw Payload Examples
/// See docs: <https://binance-docs.github.io/apidocs/spot/en/#24hr-ticker-price-change-statistics>
/// ```json
/// {"symbol":"BTCUSDT","priceChangePercent":"1.2345","quoteVolume":"1000000", ...}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BinanceTicker24h {
    symbol: SmolStr,
    #[serde(rename = "priceChangePercent", deserialize_with = "de_str")]
    price_change_percent: f64,
    #[serde(rename = "quoteVolume", deserialize_with = "de_str")]
    quote_volume: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct BinanceSymbolRow {
    symbol: SmolStr,
}

#[derive(Clone, Debug, Deserialize)]
struct BinanceFundingRate {
    symbol: SmolStr,
    #[serde(rename = "lastFundingRate", deserialize_with = "de_str")]
    last_funding_rate: f64,
}

/// ```json
/// {"openInterest":"84548.990","symbol":"BTCUSDT","time":1738480839502}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BinanceOpenInterest {
    symbol: SmolStr,
    time: i64,
    #[serde(rename = "openInterest", deserialize_with = "de_str")]
    open_interest: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct BinanceLastPrice {
    symbol: SmolStr,
    #[serde(rename = "lastPrice", deserialize_with = "de_str")]
    last_price: f64,
}

/// Streaming kline message, either bare or wrapped in the combined-stream `data` envelope.
///
/// ### Raw Payload Examples
/// See docs: <https://binance-docs.github.io/apidocs/spot/en/#kline-candlestick-streams>
/// ```json
/// {"e":"kline","E":1700000061000,"s":"BTCUSDT","k":{
///     "t":1700000000000,"T":1700000059999,"s":"BTCUSDT","i":"1m",
///     "o":"10","c":"10.5","h":"11","l":"9","v":"55","q":"1234.5","x":false
/// }}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BinanceKlineMessage {
    #[serde(rename = "k")]
    kline: BinanceKlinePayload,
}

#[derive(Clone, Debug, Deserialize)]
struct BinanceKlinePayload {
    #[serde(rename = "s")]
    symbol: SmolStr,
    #[serde(rename = "t")]
    open_time: i64,
    #[serde(rename = "T")]
    close_time: i64,
    #[serde(rename = "i")]
    interval: SmolStr,
    #[serde(rename = "o", deserialize_with = "de_str")]
    open: f64,
    #[serde(rename = "h", deserialize_with = "de_str")]
    high: f64,
    #[serde(rename = "l", deserialize_with = "de_str")]
    low: f64,
    #[serde(rename = "c", deserialize_with = "de_str")]
    close: f64,
    /// Quote-asset volume - the USDT-denominated field, not the base `v`.
    #[serde(rename = "q", deserialize_with = "de_str")]
    quote_volume: f64,
    #[serde(rename = "x")]
    closed: bool,
}

/// ### Raw Payload Examples
/// See docs: <https://binance-docs.github.io/apidocs/spot/en/#aggregate-trade-streams>
/// ```json
/// {"e":"aggTrade","E":1700000000100,"s":"BTCUSDT","a":12345,"p":"30000.1","q":"0.05",
///  "f":100,"l":105,"T":1700000000099,"m":true}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BinanceAggTrade {
    #[serde(rename = "T")]
    time: i64,
    #[serde(rename = "s")]
    symbol: SmolStr,
    #[serde(rename = "m")]
    buyer_is_maker: bool,
    #[serde(rename = "p", deserialize_with = "de_str")]
    price: f64,
    #[serde(rename = "q", deserialize_with = "de_str")]
    amount: f64,
}

/// Forced liquidation from the futures `!forceOrder@arr` stream.
///
/// ```json
/// {"e":"forceOrder","E":1700000000000,"o":{"s":"BTCUSDT","S":"SELL","q":"0.014",
///  "p":"30100","ap":"30089.7","X":"FILLED","T":1699999999998}}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BinanceLiquidationMessage {
    #[serde(rename = "o")]
    order: BinanceLiquidationOrder,
}

#[derive(Clone, Debug, Deserialize)]
struct BinanceLiquidationOrder {
    #[serde(rename = "s")]
    symbol: SmolStr,
    #[serde(rename = "S")]
    side: Side,
    #[serde(rename = "q", deserialize_with = "de_str")]
    amount: f64,
    #[serde(rename = "ap", deserialize_with = "de_str")]
    average_price: f64,
    #[serde(rename = "T")]
    time: i64,
}

/// REST kline row: `[openTime, open, high, low, close, volume, closeTime, quoteVolume, ...]`.
/// Column 7 carries the quote-asset volume.
#[derive(Clone, Debug, Deserialize)]
struct BinanceKlineRow(
    i64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_flexible_f64")] f64,
    i64,
    #[serde(deserialize_with = "de_flexible_f64")] f64,
    #[serde(default)] Option<Value>,
    #[serde(default)] Option<Value>,
    #[serde(default)] Option<Value>,
    #[serde(default)] Option<Value>,
);

/// Unwrap the combined-stream envelope, if present.
fn unwrap_stream(raw: &Value) -> &Value {
    raw.get("data").unwrap_or(raw)
}

impl VenueAdapter for Binance {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let rows: Vec<BinanceSymbolRow> = from_raw(Venue::Binance, raw)?;
        Ok(rows
            .into_iter()
            .map(|row| row.symbol)
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
        let rows: Vec<BinanceTicker24h> = from_raw(Venue::Binance, raw)?;
        Ok(rows
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("USDT"))
            .map(|row| {
                (
                    row.symbol,
                    // Quote volume is truncated to whole USDT on Binance summaries
                    TickerDaily::new(row.price_change_percent, row.quote_volume.trunc()),
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
        let rows: Vec<BinanceFundingRate> = from_raw(Venue::Binance, raw)?;
        Ok(rows
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("USDT"))
            .map(|row| (row.symbol, row.last_funding_rate * 100.0))
            .collect())
    }

    fn open_interest(&self, raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        // The endpoint answers per symbol; callers may batch responses into an array
        let rows: Vec<BinanceOpenInterest> = if raw.is_array() {
            from_raw(Venue::Binance, raw)?
        } else {
            vec![from_raw(Venue::Binance, raw)?]
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.symbol,
                    OpenInterest {
                        time: row.time,
                        value: row.open_interest,
                    },
                )
            })
            .collect())
    }

    fn kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        let rows: Vec<BinanceKlineRow> = from_raw(Venue::Binance, raw)?;
        Ok(rows
            .into_iter()
            .map(|row| Kline {
                symbol: SmolStr::default(),
                open_time: row.0,
                open: row.1,
                high: row.2,
                low: row.3,
                close: row.4,
                quote_volume: row.7,
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
        let message: BinanceKlineMessage = from_raw(Venue::Binance, unwrap_stream(raw))?;
        let kline = message.kline;
        Ok(vec![Kline {
            symbol: kline.symbol,
            open_time: kline.open_time,
            open: kline.open,
            high: kline.high,
            low: kline.low,
            close: kline.close,
            quote_volume: kline.quote_volume,
            interval: Some(kline.interval),
            close_time: Some(kline.close_time),
            closed: Some(kline.closed),
        }])
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let trade: BinanceAggTrade = from_raw(Venue::Binance, unwrap_stream(raw))?;
        Ok(vec![AggTrade {
            time: trade.time,
            symbol: trade.symbol,
            side: if trade.buyer_is_maker {
                Side::Sell
            } else {
                Side::Buy
            },
            price: trade.price,
            amount: trade.amount,
        }])
    }

    fn liquidation_message(&self, raw: &Value) -> Result<Vec<Liquidation>, AdaptError> {
        let message: BinanceLiquidationMessage = from_raw(Venue::Binance, unwrap_stream(raw))?;
        let order = message.order;
        Ok(vec![Liquidation {
            time: order.time,
            symbol: order.symbol,
            side: order.side,
            amount: order.amount,
            price: order.average_price,
        }])
    }

    fn depth(&self, raw: &Value) -> Result<Depth, AdaptError> {
        Depth::from_raw_levels(Venue::Binance, &raw["asks"], &raw["bids"])
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        let rows: Vec<BinanceLastPrice> = from_raw(Venue::Binance, raw)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.symbol, row.last_price))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DepthLevel;
    use serde_json::json;

    #[test]
    fn test_binance_ticker_24h() {
        let raw = json!([
            {"symbol": "BTCUSDT", "priceChangePercent": "1.2345", "quoteVolume": "1000000"},
            {"symbol": "ETHBTC", "priceChangePercent": "-0.42", "quoteVolume": "999"}
        ]);

        let actual = Binance.ticker_24h(&raw, true).unwrap();

        assert_eq!(actual.len(), 1);
        assert_eq!(
            actual[&SmolStr::new("BTCUSDT")],
            TickerDaily {
                change_pct: 1.23,
                quote_volume: 1000000.0,
            }
        );
    }

    #[test]
    fn test_binance_kline_message() {
        struct TestCase {
            input: Value,
            expected: Result<Vec<Kline>, AdaptError>,
        }

        let tests = vec![
            TestCase {
                // TC0: bare single-stream message
                input: json!({
                    "e": "kline", "E": 1700000061000i64, "s": "BTCUSDT",
                    "k": {
                        "t": 1700000000000i64, "T": 1700000059999i64, "s": "BTCUSDT",
                        "i": "1m", "o": "10", "c": "10.5", "h": "11", "l": "9",
                        "v": "55", "q": "1234.5", "x": false
                    }
                }),
                expected: Ok(vec![Kline {
                    symbol: SmolStr::new("BTCUSDT"),
                    open_time: 1700000000000,
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.5,
                    quote_volume: 1234.5,
                    interval: Some(SmolStr::new("1m")),
                    close_time: Some(1700000059999),
                    closed: Some(false),
                }]),
            },
            TestCase {
                // TC1: combined-stream envelope unwraps to the same result
                input: json!({
                    "stream": "btcusdt@kline_1m",
                    "data": {
                        "e": "kline", "E": 1700000061000i64, "s": "BTCUSDT",
                        "k": {
                            "t": 1700000000000i64, "T": 1700000059999i64, "s": "BTCUSDT",
                            "i": "1m", "o": "10", "c": "10.5", "h": "11", "l": "9",
                            "v": "55", "q": "1234.5", "x": false
                        }
                    }
                }),
                expected: Ok(vec![Kline {
                    symbol: SmolStr::new("BTCUSDT"),
                    open_time: 1700000000000,
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.5,
                    quote_volume: 1234.5,
                    interval: Some(SmolStr::new("1m")),
                    close_time: Some(1700000059999),
                    closed: Some(false),
                }]),
            },
            TestCase {
                // TC2: missing kline envelope is an adapt failure
                input: json!({"e": "kline"}),
                expected: Err(AdaptError::new(Venue::Binance, "missing field")),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = Binance.kline_message(&test.input);
            match (actual, test.expected) {
                (Ok(actual), Ok(expected)) => assert_eq!(actual, expected, "TC{index} failed"),
                (Err(_), Err(_)) => {}
                (actual, expected) => panic!(
                    "TC{index} failed because actual != expected. \nActual: {actual:?}\nExpected: {expected:?}\n"
                ),
            }
        }
    }

    #[test]
    fn test_binance_aggtrades_message_side() {
        let raw = json!({
            "e": "aggTrade", "E": 1700000000100i64, "s": "BTCUSDT", "a": 1,
            "p": "30000.1", "q": "0.05", "T": 1700000000099i64, "m": true
        });
        let actual = Binance.aggtrades_message(&raw).unwrap();
        assert_eq!(actual[0].side, Side::Sell);
        assert_eq!(actual[0].amount, 0.05);

        let raw = json!({
            "data": {
                "e": "aggTrade", "E": 1700000000100i64, "s": "BTCUSDT", "a": 1,
                "p": "30000.1", "q": "0.05", "T": 1700000000099i64, "m": false
            }
        });
        let actual = Binance.aggtrades_message(&raw).unwrap();
        assert_eq!(actual[0].side, Side::Buy);
    }

    #[test]
    fn test_binance_depth_sorts() {
        let raw = json!({
            "lastUpdateId": 1,
            "asks": [["100", "1"], ["99", "2"]],
            "bids": [["98", "3"], ["97", "1"]]
        });

        let actual = Binance.depth(&raw).unwrap();

        assert_eq!(
            actual.asks,
            vec![
                DepthLevel { price: 99.0, amount: 2.0 },
                DepthLevel { price: 100.0, amount: 1.0 },
            ]
        );
        assert_eq!(
            actual.bids,
            vec![
                DepthLevel { price: 98.0, amount: 3.0 },
                DepthLevel { price: 97.0, amount: 1.0 },
            ]
        );
    }

    #[test]
    fn test_binance_adapter_purity() {
        let raw = json!([
            {"symbol": "BTCUSDT", "priceChangePercent": "1.2345", "quoteVolume": "1000000"}
        ]);
        assert_eq!(
            Binance.ticker_24h(&raw, true).unwrap(),
            Binance.ticker_24h(&raw, true).unwrap(),
        );
    }
}
