use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, TickerDaily},
};
use marketwire_instrument::{Side, Venue};
use marketwire_integration::de::de_str;
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use super::Hyperliquid;

/// `metaAndAssetCtxs` response: `[{"universe":[{"name":"BTC",...},...]}, [ctx, ctx, ...]]`.
///
/// The universe and the context list are aligned by position only - if the venue ever
/// reorders one of them, this zipping misattributes every context. The alignment is pinned by
/// a test below.
#[derive(Clone, Debug, Deserialize)]
struct HyperliquidMetaAndCtxs(HyperliquidMeta, Vec<HyperliquidAssetCtx>);

#[derive(Clone, Debug, Deserialize)]
struct HyperliquidMeta {
    universe: Vec<HyperliquidAsset>,
}

#[derive(Clone, Debug, Deserialize)]
struct HyperliquidAsset {
    name: SmolStr,
}

#[derive(Clone, Debug, Deserialize)]
struct HyperliquidAssetCtx {
    #[serde(rename = "markPx", deserialize_with = "de_str")]
    mark_px: f64,
    #[serde(rename = "prevDayPx", deserialize_with = "de_str")]
    prev_day_px: f64,
    #[serde(rename = "dayNtlVlm", deserialize_with = "de_str")]
    day_ntl_vlm: f64,
    #[serde(rename = "openInterest", deserialize_with = "de_str")]
    open_interest: f64,
    #[serde(rename = "funding", default, deserialize_with = "de_opt_str")]
    funding: Option<f64>,
}

fn de_opt_str<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Streaming trade: `{"channel":"trades","data":[{"coin":"BTC","side":"B","px":"30000",
/// "sz":"0.05","time":1700000000000,"tid":1}]}` - side `B` buys, `A` sells.
#[derive(Clone, Debug, Deserialize)]
struct HyperliquidTradeMessage {
    data: Vec<HyperliquidTrade>,
}

#[derive(Clone, Debug, Deserialize)]
struct HyperliquidTrade {
    coin: SmolStr,
    side: String,
    #[serde(deserialize_with = "de_str")]
    px: f64,
    #[serde(deserialize_with = "de_str")]
    sz: f64,
    time: i64,
}

fn zipped(raw: &Value) -> Result<Vec<(SmolStr, HyperliquidAssetCtx)>, AdaptError> {
    let response: HyperliquidMetaAndCtxs = from_raw(Venue::Hyperliquid, raw)?;
    Ok(response
        .0
        .universe
        .into_iter()
        .map(|asset| asset.name)
        .zip(response.1)
        .collect())
}

impl VenueAdapter for Hyperliquid {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    /// Hyperliquid perpetuals are named by bare coin (`BTC`); there is no USDT suffix to
    /// filter on.
    fn futures_tickers(&self, raw: &Value, _only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: HyperliquidMetaAndCtxs = from_raw(Venue::Hyperliquid, raw)?;
        Ok(response
            .0
            .universe
            .into_iter()
            .map(|asset| asset.name)
            .collect())
    }

    fn futures_ticker_24h(
        &self,
        raw: &Value,
        _only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        Ok(zipped(raw)?
            .into_iter()
            .map(|(name, ctx)| {
                let change_pct = if ctx.prev_day_px == 0.0 {
                    0.0
                } else {
                    (ctx.mark_px - ctx.prev_day_px) / ctx.prev_day_px * 100.0
                };
                (name, TickerDaily::new(change_pct, ctx.day_ntl_vlm))
            })
            .collect())
    }

    fn funding_rate(&self, raw: &Value, _only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        Ok(zipped(raw)?
            .into_iter()
            .filter_map(|(name, ctx)| ctx.funding.map(|rate| (name, rate * 100.0)))
            .collect())
    }

    /// The asset contexts carry no timestamp; `time` is zero and callers stamp receipt time
    /// themselves.
    fn open_interest(
        &self,
        raw: &Value,
    ) -> Result<SymbolMap<crate::records::OpenInterest>, AdaptError> {
        Ok(zipped(raw)?
            .into_iter()
            .map(|(name, ctx)| {
                (
                    name,
                    crate::records::OpenInterest {
                        time: 0,
                        value: ctx.open_interest,
                    },
                )
            })
            .collect())
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let message: HyperliquidTradeMessage = from_raw(Venue::Hyperliquid, raw)?;
        message
            .data
            .into_iter()
            .map(|trade| {
                let side = match trade.side.as_str() {
                    "B" => Side::Buy,
                    "A" => Side::Sell,
                    other => {
                        return Err(AdaptError::new(
                            Venue::Hyperliquid,
                            format!("unknown trade side: {other}"),
                        ));
                    }
                };
                Ok(AggTrade {
                    time: trade.time,
                    symbol: trade.coin,
                    side,
                    price: trade.px,
                    amount: trade.sz,
                })
            })
            .collect()
    }

    fn futures_last_price(&self, raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        Ok(zipped(raw)?
            .into_iter()
            .map(|(name, ctx)| (name, ctx.mark_px))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta_and_ctxs() -> Value {
        json!([
            {"universe": [{"name": "BTC"}, {"name": "ETH"}]},
            [
                {"markPx": "110", "prevDayPx": "100", "dayNtlVlm": "5000000",
                 "openInterest": "845.48", "funding": "0.0000125"},
                {"markPx": "2000", "prevDayPx": "2000", "dayNtlVlm": "3000000",
                 "openInterest": "12000", "funding": "-0.0000125"}
            ]
        ])
    }

    #[test]
    fn test_hyperliquid_universe_ctx_alignment() {
        // Positional zip: universe[i] must describe ctxs[i]. If Hyperliquid ever reorders
        // either list this attribution breaks - this test pins the assumption.
        let actual = Hyperliquid.futures_ticker_24h(&meta_and_ctxs(), true).unwrap();

        assert_eq!(
            actual[&SmolStr::new("BTC")],
            TickerDaily {
                change_pct: 10.0,
                quote_volume: 5000000.0,
            }
        );
        assert_eq!(actual[&SmolStr::new("ETH")].change_pct, 0.0);
    }

    #[test]
    fn test_hyperliquid_open_interest_and_funding() {
        let oi = Hyperliquid.open_interest(&meta_and_ctxs()).unwrap();
        assert_eq!(oi[&SmolStr::new("BTC")].value, 845.48);

        let funding = Hyperliquid.funding_rate(&meta_and_ctxs(), true).unwrap();
        assert_eq!(funding[&SmolStr::new("BTC")], 0.00125);
    }

    #[test]
    fn test_hyperliquid_trades_message() {
        let raw = json!({
            "channel": "trades",
            "data": [{"coin": "BTC", "side": "A", "px": "30000.1", "sz": "0.05",
                      "time": 1700000000000i64, "tid": 1}]
        });

        let actual = Hyperliquid.aggtrades_message(&raw).unwrap();
        assert_eq!(actual[0].side, Side::Sell);
        assert_eq!(actual[0].symbol, SmolStr::new("BTC"));
    }
}
