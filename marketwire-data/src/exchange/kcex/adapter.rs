use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, OpenInterest, TickerDaily},
};
use marketwire_instrument::{Side, Venue};
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use super::Kcex;

#[derive(Clone, Debug, Deserialize)]
struct KcexData<T> {
    data: Vec<T>,
}

/// Contract ticker row - numbers arrive as JSON numbers, not strings.
///
/// ```json
/// {"symbol":"BTC_USDT","lastPrice":30000.1,"riseFallRate":-0.0144,"amount24":4171772565.5,
///  "holdVol":253676226,"fundingRate":0.000097,"timestamp":1748014472368}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct KcexTicker {
    symbol: SmolStr,
    #[serde(rename = "lastPrice")]
    last_price: f64,
    #[serde(rename = "riseFallRate", default)]
    rise_fall_rate: Option<f64>,
    #[serde(rename = "amount24", default)]
    amount_24h: Option<f64>,
    #[serde(rename = "holdVol", default)]
    hold_vol: Option<f64>,
    #[serde(rename = "fundingRate", default)]
    funding_rate: Option<f64>,
    #[serde(default)]
    timestamp: i64,
}

/// Streaming deal push, MEXC-contract style: `{"symbol":"BTC_USDT","data":[{"t":...,
/// "p":...,"v":...,"M":1}]}` - `M` set marks a sell.
#[derive(Clone, Debug, Deserialize)]
struct KcexDealMessage {
    symbol: SmolStr,
    data: Vec<KcexDeal>,
}

#[derive(Clone, Debug, Deserialize)]
struct KcexDeal {
    t: i64,
    p: f64,
    v: f64,
    #[serde(rename = "M", default)]
    maker: i64,
}

impl VenueAdapter for Kcex {
    fn venue(&self) -> Venue {
        Venue::Kcex
    }

    fn futures_tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: KcexData<KcexTicker> = from_raw(Venue::Kcex, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|row| row.symbol)
            .filter(|symbol| !only_usdt || symbol.ends_with("USDT"))
            .collect())
    }

    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let response: KcexData<KcexTicker> = from_raw(Venue::Kcex, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("USDT"))
            .map(|row| {
                (
                    row.symbol,
                    TickerDaily::from_fraction(
                        row.rise_fall_rate.unwrap_or_default(),
                        row.amount_24h.unwrap_or_default(),
                    ),
                )
            })
            .collect())
    }

    fn funding_rate(&self, raw: &Value, only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        let response: KcexData<KcexTicker> = from_raw(Venue::Kcex, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("USDT"))
            .filter_map(|row| row.funding_rate.map(|rate| (row.symbol, rate * 100.0)))
            .collect())
    }

    /// `holdVol` is in contracts on the wire; run the KCEX contract-size fix first so the
    /// values land in base units.
    fn open_interest(&self, raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        let response: KcexData<KcexTicker> = from_raw(Venue::Kcex, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter_map(|row| {
                row.hold_vol.map(|value| {
                    (
                        row.symbol,
                        OpenInterest {
                            time: row.timestamp,
                            value,
                        },
                    )
                })
            })
            .collect())
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let message: KcexDealMessage = from_raw(Venue::Kcex, raw)?;
        Ok(message
            .data
            .into_iter()
            .map(|deal| AggTrade {
                time: deal.t,
                symbol: message.symbol.clone(),
                side: if deal.maker != 0 { Side::Sell } else { Side::Buy },
                price: deal.p,
                amount: deal.v,
            })
            .collect())
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        let response: KcexData<KcexTicker> = from_raw(Venue::Kcex, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|row| (row.symbol, row.last_price))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kcex_open_interest_reads_hold_vol() {
        // After the contract-size fix, holdVol is base units; the adapter must not multiply
        // by price
        let raw = json!({
            "data": [{"symbol": "BTC_USDT", "lastPrice": 30000.0, "holdVol": 2536.76,
                      "riseFallRate": 0.01, "amount24": 1000.0, "fundingRate": 0.0001,
                      "timestamp": 1748014472368i64}]
        });

        let actual = Kcex.open_interest(&raw).unwrap();
        assert_eq!(
            actual[&SmolStr::new("BTC_USDT")],
            OpenInterest {
                time: 1748014472368,
                value: 2536.76,
            }
        );
    }

    #[test]
    fn test_kcex_deal_message() {
        let raw = json!({
            "symbol": "BTC_USDT",
            "channel": "push.deal",
            "data": [{"t": 1700000000000i64, "p": 30000.1, "v": 5.0, "M": 1}]
        });

        let actual = Kcex.aggtrades_message(&raw).unwrap();
        assert_eq!(actual[0].side, Side::Sell);
        assert_eq!(actual[0].symbol, SmolStr::new("BTC_USDT"));
    }
}
