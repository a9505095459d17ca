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

use super::Okx;

const SUFFIX_SPOT: &str = "-USDT";
const SUFFIX_SWAP: &str = "-USDT-SWAP";

/// OKX REST/stream envelope: `{"code":"0","data":[...]}`.
#[derive(Clone, Debug, Deserialize)]
struct OkxData<T> {
    data: Vec<T>,
}

/// ### Raw Payload Examples
/// See docs: <https://www.okx.com/docs-v5/en/#order-book-trading-market-data-get-tickers>
/// ```json
/// {"instType":"SWAP","instId":"BTC-USDT-SWAP","last":"104690","open24h":"104492.9",
///  "volCcy24h":"99054.5377","vol24h":"9905453.77","ts":"1747753958313", ...}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct OkxTicker {
    #[serde(rename = "instId")]
    inst_id: SmolStr,
    #[serde(deserialize_with = "de_str")]
    last: f64,
    #[serde(rename = "open24h", deserialize_with = "de_str")]
    open_24h: f64,
    #[serde(rename = "volCcy24h", deserialize_with = "de_str")]
    vol_ccy_24h: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct OkxFundingRate {
    #[serde(rename = "instId")]
    inst_id: SmolStr,
    #[serde(rename = "fundingRate", deserialize_with = "de_str")]
    funding_rate: f64,
}

/// ```json
/// {"instId":"BTC-USDT-SWAP","instType":"SWAP","oi":"84548","oiCcy":"845.48",
///  "ts":"1738480839502"}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct OkxOpenInterest {
    #[serde(rename = "instId")]
    inst_id: SmolStr,
    #[serde(deserialize_with = "de_str")]
    oi: f64,
    #[serde(deserialize_with = "de_str")]
    ts: i64,
}

/// ### Raw Payload Examples
/// See docs: <https://www.okx.com/docs-v5/en/#order-book-trading-market-data-ws-all-trades-channel>
/// ```json
/// {"arg":{"channel":"trades-all","instId":"BTC-USDT-SWAP"},
///  "data":[{"instId":"BTC-USDT-SWAP","tradeId":"1","px":"30000","sz":"0.05",
///  "side":"buy","ts":"1700000000000"}]}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct OkxTrade {
    #[serde(rename = "instId")]
    inst_id: SmolStr,
    #[serde(deserialize_with = "de_str")]
    px: f64,
    #[serde(deserialize_with = "de_str")]
    sz: f64,
    side: Side,
    #[serde(deserialize_with = "de_str")]
    ts: i64,
}

/// Candle row: `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]` - column 7 is the
/// quote-currency volume.
#[derive(Clone, Debug, Deserialize)]
struct OkxCandleRow(
    #[serde(deserialize_with = "de_str")] i64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
    #[serde(deserialize_with = "de_str")] f64,
);

#[derive(Clone, Debug, Deserialize)]
struct OkxCandleMessage {
    arg: OkxCandleArg,
    data: Vec<OkxCandleRow>,
}

#[derive(Clone, Debug, Deserialize)]
struct OkxCandleArg {
    channel: String,
    #[serde(rename = "instId")]
    inst_id: SmolStr,
}

/// ### Raw Payload Examples
/// See docs: <https://www.okx.com/docs-v5/en/#public-data-websocket-liquidation-orders-channel>
/// ```json
/// {"arg":{"channel":"liquidation-orders","instType":"SWAP"},
///  "data":[{"instId":"BTC-USDT-SWAP","details":[{"side":"buy","sz":"0.01",
///  "bkPx":"30000","ts":"1700000000000"}]}]}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct OkxLiquidation {
    #[serde(rename = "instId")]
    inst_id: SmolStr,
    details: Vec<OkxLiquidationDetail>,
}

#[derive(Clone, Debug, Deserialize)]
struct OkxLiquidationDetail {
    side: Side,
    #[serde(deserialize_with = "de_str")]
    sz: f64,
    #[serde(rename = "bkPx", deserialize_with = "de_str")]
    bk_px: f64,
    #[serde(deserialize_with = "de_str")]
    ts: i64,
}

fn ticker_daily(ticker: &OkxTicker) -> TickerDaily {
    // OKX reports no percent field; derive it from the 24h open
    let change_pct = if ticker.open_24h == 0.0 {
        0.0
    } else {
        (ticker.last - ticker.open_24h) / ticker.open_24h * 100.0
    };
    TickerDaily::new(change_pct, ticker.vol_ccy_24h)
}

fn symbols_with_suffix(
    raw: &Value,
    only_usdt: bool,
    suffix: &str,
) -> Result<Vec<SmolStr>, AdaptError> {
    let response: OkxData<OkxTicker> = from_raw(Venue::Okx, raw)?;
    Ok(response
        .data
        .into_iter()
        .map(|ticker| ticker.inst_id)
        .filter(|symbol| !only_usdt || symbol.ends_with(suffix))
        .collect())
}

fn ticker_24h_with_suffix(
    raw: &Value,
    only_usdt: bool,
    suffix: &str,
) -> Result<SymbolMap<TickerDaily>, AdaptError> {
    let response: OkxData<OkxTicker> = from_raw(Venue::Okx, raw)?;
    Ok(response
        .data
        .into_iter()
        .filter(|ticker| !only_usdt || ticker.inst_id.ends_with(suffix))
        .map(|ticker| {
            let daily = ticker_daily(&ticker);
            (ticker.inst_id, daily)
        })
        .collect())
}

impl VenueAdapter for Okx {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    /// Symbols keep OKX's native `BTC-USDT` form.
    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        symbols_with_suffix(raw, only_usdt, SUFFIX_SPOT)
    }

    /// Symbols keep OKX's native `BTC-USDT-SWAP` form.
    fn futures_tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        symbols_with_suffix(raw, only_usdt, SUFFIX_SWAP)
    }

    fn ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        ticker_24h_with_suffix(raw, only_usdt, SUFFIX_SPOT)
    }

    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        ticker_24h_with_suffix(raw, only_usdt, SUFFIX_SWAP)
    }

    /// Accepts both one funding-rate response and a batched array of per-instrument responses;
    /// the endpoint answers per instrument.
    fn funding_rate(&self, raw: &Value, _only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        let responses: Vec<OkxData<OkxFundingRate>> = if raw.is_array() {
            from_raw(Venue::Okx, raw)?
        } else {
            vec![from_raw(Venue::Okx, raw)?]
        };

        responses
            .into_iter()
            .map(|response| {
                let row = response.data.into_iter().next().ok_or_else(|| {
                    AdaptError::new(Venue::Okx, "funding rate response with empty data")
                })?;
                Ok((row.inst_id, row.funding_rate * 100.0))
            })
            .collect()
    }

    /// Sizes come back in contracts - run the OKX contract-size fix on the raw payload first.
    fn open_interest(&self, raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        let response: OkxData<OkxOpenInterest> = from_raw(Venue::Okx, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|row| {
                (
                    row.inst_id,
                    OpenInterest {
                        time: row.ts,
                        value: row.oi,
                    },
                )
            })
            .collect())
    }

    fn kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        let response: OkxData<OkxCandleRow> = from_raw(Venue::Okx, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|row| kline_from_row(SmolStr::default(), None, row))
            .collect())
    }

    fn futures_kline(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        self.kline(raw)
    }

    fn kline_message(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        let message: OkxCandleMessage = from_raw(Venue::Okx, raw)?;
        let interval = SmolStr::new(message.arg.channel.trim_start_matches("candle"));

        Ok(message
            .data
            .into_iter()
            .map(|row| {
                kline_from_row(message.arg.inst_id.clone(), Some(interval.clone()), row)
            })
            .collect())
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let message: OkxData<OkxTrade> = from_raw(Venue::Okx, raw)?;
        Ok(message
            .data
            .into_iter()
            .map(|trade| AggTrade {
                time: trade.ts,
                symbol: trade.inst_id,
                side: trade.side,
                price: trade.px,
                amount: trade.sz,
            })
            .collect())
    }

    fn liquidation_message(&self, raw: &Value) -> Result<Vec<Liquidation>, AdaptError> {
        let message: OkxData<OkxLiquidation> = from_raw(Venue::Okx, raw)?;
        Ok(message
            .data
            .into_iter()
            .flat_map(|order| {
                let symbol = order.inst_id;
                order
                    .details
                    .into_iter()
                    .map(move |detail| Liquidation {
                        time: detail.ts,
                        symbol: symbol.clone(),
                        side: detail.side,
                        amount: detail.sz,
                        price: detail.bk_px,
                    })
            })
            .collect())
    }

    fn depth(&self, raw: &Value) -> Result<Depth, AdaptError> {
        let book = raw["data"]
            .get(0)
            .ok_or_else(|| AdaptError::new(Venue::Okx, "depth response with empty data"))?;
        Depth::from_raw_levels(Venue::Okx, &book["asks"], &book["bids"])
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        let response: OkxData<OkxTicker> = from_raw(Venue::Okx, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|ticker| (ticker.inst_id, ticker.last))
            .collect())
    }
}

fn kline_from_row(symbol: SmolStr, interval: Option<SmolStr>, row: OkxCandleRow) -> Kline {
    Kline {
        symbol,
        open_time: row.0,
        open: row.1,
        high: row.2,
        low: row.3,
        close: row.4,
        quote_volume: row.7,
        interval,
        close_time: None,
        closed: Some(row.8 == 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_okx_futures_ticker_24h_derives_percent() {
        let raw = json!({
            "code": "0",
            "data": [
                {"instId": "BTC-USDT-SWAP", "last": "110", "open24h": "100",
                 "volCcy24h": "99054.5377", "vol24h": "9905453.77"},
                {"instId": "BTC-USD-SWAP", "last": "1", "open24h": "1",
                 "volCcy24h": "1", "vol24h": "1"}
            ]
        });

        let actual = Okx.futures_ticker_24h(&raw, true).unwrap();

        assert_eq!(actual.len(), 1);
        assert_eq!(
            actual[&SmolStr::new("BTC-USDT-SWAP")],
            TickerDaily {
                change_pct: 10.0,
                quote_volume: 99054.5377,
            }
        );
    }

    #[test]
    fn test_okx_funding_rate_both_shapes() {
        let single = json!({"data": [{"instId": "BTC-USDT-SWAP", "fundingRate": "0.0001"}]});
        let actual = Okx.funding_rate(&single, true).unwrap();
        assert_eq!(actual[&SmolStr::new("BTC-USDT-SWAP")], 0.01);

        let batched = json!([
            {"data": [{"instId": "BTC-USDT-SWAP", "fundingRate": "0.0001"}]},
            {"data": [{"instId": "ETH-USDT-SWAP", "fundingRate": "-0.0002"}]}
        ]);
        let actual = Okx.funding_rate(&batched, true).unwrap();
        assert_eq!(actual.len(), 2);
        assert_eq!(actual[&SmolStr::new("ETH-USDT-SWAP")], -0.02);
    }

    #[test]
    fn test_okx_aggtrades_message() {
        let raw = json!({
            "arg": {"channel": "trades-all", "instId": "BTC-USDT-SWAP"},
            "data": [{"instId": "BTC-USDT-SWAP", "sz": "0.05", "px": "30000",
                      "side": "buy", "ts": "1700000000000"}]
        });

        let actual = Okx.aggtrades_message(&raw).unwrap();

        assert_eq!(
            actual,
            vec![AggTrade {
                time: 1700000000000,
                symbol: SmolStr::new("BTC-USDT-SWAP"),
                side: Side::Buy,
                price: 30000.0,
                amount: 0.05,
            }]
        );
    }

    #[test]
    fn test_okx_kline_message_strips_channel_prefix() {
        let raw = json!({
            "arg": {"channel": "candle1H", "instId": "BTC-USDT"},
            "data": [["1700000000000", "10", "11", "9", "10.5", "55", "5.5", "1234.5", "0"]]
        });

        let actual = Okx.kline_message(&raw).unwrap();

        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].interval, Some(SmolStr::new("1H")));
        assert_eq!(actual[0].quote_volume, 1234.5);
        assert_eq!(actual[0].closed, Some(false));
    }
}
