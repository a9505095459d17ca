use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, Depth, Kline, OpenInterest, TickerDaily},
};
use marketwire_instrument::{Side, Venue};
use marketwire_integration::de::{de_flexible_f64, de_str};
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use super::Mexc;

/// Spot 24h statistics row.
///
/// MEXC reports `priceChangePercent` as a fraction despite its name.
#[derive(Clone, Debug, Deserialize)]
struct MexcSpotTicker {
    symbol: SmolStr,
    #[serde(rename = "priceChangePercent", deserialize_with = "de_flexible_f64")]
    price_change_percent: f64,
    #[serde(rename = "quoteVolume", deserialize_with = "de_flexible_f64")]
    quote_volume: f64,
}

/// Contract ticker row - also the open-interest and last-price source.
///
/// ### Raw Payload Examples
/// See docs: <https://mexcdevelop.github.io/apidocs/contract_v1_en/#get-the-contract-information>
/// ```json
/// {"symbol":"BTC_USDT","lastPrice":109630.3,"volume24":378537842,
///  "amount24":4171772565.5,"holdVol":253676226,"lower24Price":107261.5,
///  "high24Price":111957.2,"riseFallRate":-0.0144,"fundingRate":0.000097,
///  "timestamp":1748014472368}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct MexcContractTicker {
    symbol: SmolStr,
    #[serde(rename = "lastPrice")]
    last_price: f64,
    #[serde(rename = "high24Price")]
    high_24h: f64,
    #[serde(rename = "lower24Price")]
    low_24h: f64,
    #[serde(rename = "volume24")]
    volume_24h: f64,
    #[serde(rename = "holdVol", default)]
    hold_vol: Option<f64>,
    #[serde(rename = "fundingRate", default)]
    funding_rate: Option<f64>,
    timestamp: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct MexcData<T> {
    data: Vec<T>,
}

#[derive(Clone, Debug, Deserialize)]
struct MexcFundingRate {
    symbol: SmolStr,
    #[serde(rename = "fundingRate")]
    funding_rate: f64,
}

/// Futures deal push: `{"symbol":"ETH_USDT","data":{"p":2575.2,"v":1,"T":2,"t":...},
/// "channel":"push.deal"}` - `T` 1 = buy, 2 = sell, `v` in contracts until the fix runs.
#[derive(Clone, Debug, Deserialize)]
struct MexcFuturesDealMessage {
    symbol: SmolStr,
    data: MexcFuturesDeal,
}

#[derive(Clone, Debug, Deserialize)]
struct MexcFuturesDeal {
    p: f64,
    v: f64,
    #[serde(rename = "T")]
    taker_side: i32,
    t: i64,
}

/// Futures kline push: `{"symbol":"BTC_USDT","channel":"push.kline","data":{"a":..., "c":...,
/// "h":...,"interval":"Min60","l":...,"o":...,"q":...,"symbol":"BTC_USDT","t":1700000000}}` -
/// `t` in epoch seconds, `a` is the quote amount.
#[derive(Clone, Debug, Deserialize)]
struct MexcFuturesKlineMessage {
    data: MexcFuturesKline,
}

#[derive(Clone, Debug, Deserialize)]
struct MexcFuturesKline {
    symbol: SmolStr,
    interval: SmolStr,
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    a: f64,
}

/// Spot aggre-deals frame, as re-shaped from the protobuf wrapper by
/// [`proto::PushDataV3ApiWrapper::to_value`](super::proto::PushDataV3ApiWrapper::to_value).
#[derive(Clone, Debug, Deserialize)]
struct MexcSpotDealsMessage {
    symbol: SmolStr,
    #[serde(rename = "publicAggreDeals")]
    public_aggre_deals: MexcSpotDeals,
}

#[derive(Clone, Debug, Deserialize)]
struct MexcSpotDeals {
    deals: Vec<MexcSpotDeal>,
}

#[derive(Clone, Debug, Deserialize)]
struct MexcSpotDeal {
    #[serde(deserialize_with = "de_str")]
    price: f64,
    #[serde(deserialize_with = "de_str")]
    quantity: f64,
    /// 1 = buy, 2 = sell.
    #[serde(rename = "tradeType")]
    trade_type: i32,
    time: i64,
}

/// Spot kline frame from the protobuf wrapper - window bounds in epoch seconds.
#[derive(Clone, Debug, Deserialize)]
struct MexcSpotKlineMessage {
    symbol: SmolStr,
    #[serde(rename = "publicSpotKline")]
    public_spot_kline: MexcSpotKline,
}

#[derive(Clone, Debug, Deserialize)]
struct MexcSpotKline {
    interval: SmolStr,
    #[serde(rename = "windowStart")]
    window_start: i64,
    #[serde(rename = "windowEnd")]
    window_end: i64,
    #[serde(rename = "openingPrice", deserialize_with = "de_str")]
    open: f64,
    #[serde(rename = "closingPrice", deserialize_with = "de_str")]
    close: f64,
    #[serde(rename = "highestPrice", deserialize_with = "de_str")]
    high: f64,
    #[serde(rename = "lowestPrice", deserialize_with = "de_str")]
    low: f64,
    #[serde(deserialize_with = "de_str")]
    amount: f64,
}

impl VenueAdapter for Mexc {
    fn venue(&self) -> Venue {
        Venue::Mexc
    }

    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let rows: Vec<MexcSpotTicker> = from_raw(Venue::Mexc, raw)?;
        Ok(rows
            .into_iter()
            .map(|row| row.symbol)
            .filter(|symbol| !only_usdt || symbol.ends_with("USDT"))
            .collect())
    }

    /// Futures symbols keep MEXC's native `BTC_USDT` form.
    fn futures_tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: MexcData<MexcContractTicker> = from_raw(Venue::Mexc, raw)?;
        Ok(response
            .data
            .into_iter()
            .map(|row| row.symbol)
            .filter(|symbol| !only_usdt || symbol.ends_with("_USDT"))
            .collect())
    }

    fn ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let rows: Vec<MexcSpotTicker> = from_raw(Venue::Mexc, raw)?;
        Ok(rows
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("USDT"))
            .map(|row| {
                (
                    row.symbol,
                    TickerDaily::from_fraction(row.price_change_percent, row.quote_volume),
                )
            })
            .collect())
    }

    /// The contract ticker has no 24h-open column; the percent change is derived against the
    /// 24h mid price. `volume24` is in contracts until the contract-size fix runs.
    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let response: MexcData<MexcContractTicker> = from_raw(Venue::Mexc, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("_USDT"))
            .map(|row| {
                let mid = (row.high_24h + row.low_24h) / 2.0;
                let change_pct = if mid == 0.0 {
                    0.0
                } else {
                    (row.last_price - mid) / mid * 100.0
                };
                (
                    row.symbol,
                    TickerDaily::new(change_pct, row.volume_24h),
                )
            })
            .collect())
    }

    fn funding_rate(&self, raw: &Value, only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        let response: MexcData<MexcFundingRate> = from_raw(Venue::Mexc, raw)?;
        Ok(response
            .data
            .into_iter()
            .filter(|row| !only_usdt || row.symbol.ends_with("_USDT"))
            .map(|row| (row.symbol, row.funding_rate * 100.0))
            .collect())
    }

    /// OI rides on the contract ticker's `holdVol`; run the contract-size fix first.
    fn open_interest(&self, raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        let response: MexcData<MexcContractTicker> = from_raw(Venue::Mexc, raw)?;
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

    fn kline_message(&self, raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        // Futures push and the spot protobuf re-shape are distinguished by their envelope
        if raw.get("publicSpotKline").is_some() {
            let message: MexcSpotKlineMessage = from_raw(Venue::Mexc, raw)?;
            let kline = message.public_spot_kline;
            return Ok(vec![Kline {
                symbol: message.symbol,
                open_time: kline.window_start * 1000,
                open: kline.open,
                high: kline.high,
                low: kline.low,
                close: kline.close,
                quote_volume: kline.amount,
                interval: Some(kline.interval),
                close_time: Some(kline.window_end * 1000),
                closed: None,
            }]);
        }

        let message: MexcFuturesKlineMessage = from_raw(Venue::Mexc, raw)?;
        let kline = message.data;
        Ok(vec![Kline {
            symbol: kline.symbol,
            open_time: kline.t * 1000,
            open: kline.o,
            high: kline.h,
            low: kline.l,
            close: kline.c,
            quote_volume: kline.a,
            interval: Some(kline.interval),
            close_time: None,
            closed: None,
        }])
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        if raw.get("publicAggreDeals").is_some() {
            let message: MexcSpotDealsMessage = from_raw(Venue::Mexc, raw)?;
            return Ok(message
                .public_aggre_deals
                .deals
                .into_iter()
                .map(|deal| AggTrade {
                    time: deal.time,
                    symbol: message.symbol.clone(),
                    side: if deal.trade_type == 2 {
                        Side::Sell
                    } else {
                        Side::Buy
                    },
                    price: deal.price,
                    amount: deal.quantity,
                })
                .collect());
        }

        let message: MexcFuturesDealMessage = from_raw(Venue::Mexc, raw)?;
        let deal = message.data;
        Ok(vec![AggTrade {
            time: deal.t,
            symbol: message.symbol,
            side: if deal.taker_side == 2 {
                Side::Sell
            } else {
                Side::Buy
            },
            price: deal.p,
            amount: deal.v,
        }])
    }

    fn depth(&self, raw: &Value) -> Result<Depth, AdaptError> {
        Depth::from_raw_levels(Venue::Mexc, &raw["asks"], &raw["bids"])
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        let response: MexcData<MexcContractTicker> = from_raw(Venue::Mexc, raw)?;
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
    fn test_mexc_futures_ticker_24h_mid_price_formula() {
        let raw = json!({
            "data": [{
                "symbol": "BTC_USDT", "lastPrice": 110.0, "high24Price": 120.0,
                "lower24Price": 80.0, "volume24": 1000.0, "holdVol": 500.0,
                "riseFallRate": -0.0144, "fundingRate": 0.0001,
                "timestamp": 1748014472368i64
            }]
        });

        let actual = Mexc.futures_ticker_24h(&raw, true).unwrap();

        // mid = 100, change = +10%
        assert_eq!(
            actual[&SmolStr::new("BTC_USDT")],
            TickerDaily {
                change_pct: 10.0,
                quote_volume: 1000.0,
            }
        );
    }

    #[test]
    fn test_mexc_futures_deal_message() {
        let raw = json!({
            "symbol": "ETH_USDT",
            "data": {"p": 2575.2, "v": 3.0, "T": 2, "O": 1, "M": 2, "t": 1748023214750i64},
            "channel": "push.deal",
            "ts": 1748023214750i64
        });

        let actual = Mexc.aggtrades_message(&raw).unwrap();

        assert_eq!(
            actual,
            vec![AggTrade {
                time: 1748023214750,
                symbol: SmolStr::new("ETH_USDT"),
                side: Side::Sell,
                price: 2575.2,
                amount: 3.0,
            }]
        );
    }

    #[test]
    fn test_mexc_spot_deals_message_from_protobuf_shape() {
        let raw = json!({
            "channel": "spot@public.aggre.deals.v3.api.pb@100ms@BTCUSDT",
            "symbol": "BTCUSDT",
            "sendTime": 1700000000123i64,
            "publicAggreDeals": {
                "eventType": "spot@public.aggre.deals",
                "deals": [{"price": "30000.1", "quantity": "0.05", "tradeType": 1,
                           "time": 1700000000100i64}]
            }
        });

        let actual = Mexc.aggtrades_message(&raw).unwrap();
        assert_eq!(actual[0].side, Side::Buy);
        assert_eq!(actual[0].amount, 0.05);
        assert_eq!(actual[0].symbol, SmolStr::new("BTCUSDT"));
    }

    #[test]
    fn test_mexc_spot_kline_message_scales_seconds() {
        let raw = json!({
            "channel": "spot@public.kline.v3.api.pb@BTCUSDT@Min60",
            "symbol": "BTCUSDT",
            "publicSpotKline": {
                "interval": "Min60", "windowStart": 1700000000i64, "windowEnd": 1700003600i64,
                "openingPrice": "10", "closingPrice": "10.5", "highestPrice": "11",
                "lowestPrice": "9", "volume": "55", "amount": "1234.5"
            }
        });

        let actual = Mexc.kline_message(&raw).unwrap();
        assert_eq!(actual[0].open_time, 1700000000000);
        assert_eq!(actual[0].close_time, Some(1700003600000));
        assert_eq!(actual[0].quote_volume, 1234.5);
    }
}
