use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, TickerDaily},
};
use chrono::DateTime;
use marketwire_instrument::{Side, Venue};
use marketwire_integration::de::de_str;
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use super::Bitunix;

#[derive(Clone, Debug, Deserialize)]
struct BitunixData<T> {
    data: Vec<T>,
}

/// ```json
/// {"symbol":"BTCUSDT","last":"30000","open":"29500","quoteVol":"30000000", ...}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BitunixTicker {
    symbol: SmolStr,
    #[serde(deserialize_with = "de_str")]
    last: f64,
    #[serde(deserialize_with = "de_str")]
    open: f64,
    #[serde(rename = "quoteVol", deserialize_with = "de_str")]
    quote_vol: f64,
}

/// Streaming trade - `t` is an ISO-8601 timestamp rather than epoch millis.
///
/// ```json
/// {"ch":"trade","symbol":"BTCUSDT","ts":1700000000000,
///  "data":[{"t":"2023-11-14T22:13:20.123Z","p":"30000.1","v":"0.05","s":"sell"}]}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct BitunixTradeMessage {
    symbol: SmolStr,
    data: Vec<BitunixTrade>,
}

#[derive(Clone, Debug, Deserialize)]
struct BitunixTrade {
    t: String,
    #[serde(deserialize_with = "de_str")]
    p: f64,
    #[serde(deserialize_with = "de_str")]
    v: f64,
    s: Side,
}

impl VenueAdapter for Bitunix {
    fn venue(&self) -> Venue {
        Venue::Bitunix
    }

    fn futures_tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: BitunixData<BitunixTicker> = from_raw(Venue::Bitunix, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|row| row.symbol)
            .filter(|symbol| !only_usdt || symbol.ends_with("USDT"))
            .collect())
    }

    /// The ticker has no percent column; the change is derived from the 24h open.
    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let response: BitunixData<BitunixTicker> = from_raw(Venue::Bitunix, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("USDT"))
            .map(|row| {
                let change_pct = if row.open == 0.0 {
                    0.0
                } else {
                    (row.last / row.open - 1.0) * 100.0
                };
                (row.symbol, TickerDaily::new(change_pct, row.quote_vol))
            })
            .collect())
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let message: BitunixTradeMessage = from_raw(Venue::Bitunix, raw)?;
        message
            .data
            .into_iter()
            .map(|trade| {
                let time = DateTime::parse_from_rfc3339(&trade.t)
                    .map_err(|error| {
                        AdaptError::new(
                            Venue::Bitunix,
                            format!("unparseable trade time {}: {error}", trade.t),
                        )
                    })?
                    .timestamp_millis();

                Ok(AggTrade {
                    time,
                    symbol: message.symbol.clone(),
                    side: trade.s,
                    price: trade.p,
                    amount: trade.v,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bitunix_trade_parses_iso_time() {
        let raw = json!({
            "ch": "trade",
            "symbol": "BTCUSDT",
            "data": [{"t": "2023-11-14T22:13:20.123Z", "p": "30000.1", "v": "0.05",
                      "s": "sell"}]
        });

        let actual = Bitunix.aggtrades_message(&raw).unwrap();

        assert_eq!(actual[0].time, 1700000000123);
        assert_eq!(actual[0].side, Side::Sell);
        assert_eq!(actual[0].symbol, SmolStr::new("BTCUSDT"));
    }

    #[test]
    fn test_bitunix_futures_ticker_24h() {
        let raw = json!({
            "data": [{"symbol": "BTCUSDT", "last": "110", "open": "100",
                      "quoteVol": "30000000"}]
        });

        let actual = Bitunix.futures_ticker_24h(&raw, true).unwrap();
        assert_eq!(
            actual[&SmolStr::new("BTCUSDT")],
            TickerDaily {
                change_pct: 10.0,
                quote_volume: 30000000.0,
            }
        );
    }
}
