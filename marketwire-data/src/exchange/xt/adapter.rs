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

use super::Xt;

/// XT REST envelope: `{"rc":0,"result":[...]}`. Symbols are lowercase `btc_usdt` style.
#[derive(Clone, Debug, Deserialize)]
struct XtResult<T> {
    result: Vec<T>,
}

/// Spot 24h row: `cr` is the change rate fraction, `v` the quote volume.
#[derive(Clone, Debug, Deserialize)]
struct XtSpotTicker {
    s: SmolStr,
    #[serde(deserialize_with = "de_str")]
    cr: f64,
    #[serde(deserialize_with = "de_str")]
    v: f64,
}

/// Futures 24h row: `r` is the change rate fraction.
#[derive(Clone, Debug, Deserialize)]
struct XtFuturesTicker {
    s: SmolStr,
    #[serde(deserialize_with = "de_str")]
    r: f64,
    #[serde(deserialize_with = "de_str")]
    v: f64,
}

/// Streaming trade. Futures rows mark the aggressor via `m` ("BID"/"ASK") and size via `a`;
/// spot rows mark buyer-is-maker via `b` and size via `q`.
#[derive(Clone, Debug, Deserialize)]
struct XtTradeMessage {
    data: XtTrade,
}

#[derive(Clone, Debug, Deserialize)]
struct XtTrade {
    s: SmolStr,
    t: i64,
    #[serde(deserialize_with = "de_str")]
    p: f64,
    #[serde(default)]
    m: Option<String>,
    #[serde(default, deserialize_with = "de_opt_str")]
    a: Option<f64>,
    #[serde(default)]
    b: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_str")]
    q: Option<f64>,
}

fn de_opt_str<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

impl VenueAdapter for Xt {
    fn venue(&self) -> Venue {
        Venue::Xt
    }

    /// Symbols keep XT's native lowercase `btc_usdt` form.
    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: XtResult<XtSpotTicker> = from_raw(Venue::Xt, raw)?;
        Ok(response
            .result
            .into_iter()
            .map(|row| row.s)
            .filter(|symbol| !only_usdt || symbol.ends_with("_usdt"))
            .collect())
    }

    fn futures_tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let response: XtResult<XtFuturesTicker> = from_raw(Venue::Xt, raw)?;
        Ok(response
            .result
            .into_iter()
            .map(|row| row.s)
            .filter(|symbol| !only_usdt || symbol.ends_with("_usdt"))
            .collect())
    }

    fn ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let response: XtResult<XtSpotTicker> = from_raw(Venue::Xt, raw)?;
        Ok(response
            .result
            .into_iter()
            .filter(|row| !only_usdt || row.s.ends_with("_usdt"))
            .map(|row| (row.s, TickerDaily::from_fraction(row.cr, row.v)))
            .collect())
    }

    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let response: XtResult<XtFuturesTicker> = from_raw(Venue::Xt, raw)?;
        Ok(response
            .result
            .into_iter()
            .filter(|row| !only_usdt || row.s.ends_with("_usdt"))
            .map(|row| (row.s, TickerDaily::from_fraction(row.r, row.v)))
            .collect())
    }

    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        let message: XtTradeMessage = from_raw(Venue::Xt, raw)?;
        let trade = message.data;

        let (side, amount) = match (&trade.m, trade.b) {
            // Futures: aggressor side is explicit
            (Some(maker_side), _) => (
                if maker_side == "BID" { Side::Buy } else { Side::Sell },
                trade.a,
            ),
            // Spot: buyer-is-maker implies a sell aggressor
            (None, Some(buyer_is_maker)) => (
                if buyer_is_maker { Side::Sell } else { Side::Buy },
                trade.q,
            ),
            (None, None) => {
                return Err(AdaptError::new(
                    Venue::Xt,
                    format!("trade without side marker: {raw}"),
                ));
            }
        };

        let amount = amount.ok_or_else(|| {
            AdaptError::new(Venue::Xt, format!("trade without size field: {raw}"))
        })?;

        Ok(vec![AggTrade {
            time: trade.t,
            symbol: trade.s,
            side,
            price: trade.p,
            amount,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_xt_trade_futures_and_spot_shapes() {
        struct TestCase {
            input: Value,
            expected: (Side, f64),
        }

        let tests = vec![
            TestCase {
                // TC0: futures trade, BID aggressor
                input: json!({
                    "topic": "trade",
                    "data": {"s": "btc_usdt", "t": 1700000000000i64, "p": "30000.1",
                             "m": "BID", "a": "0.05"}
                }),
                expected: (Side::Buy, 0.05),
            },
            TestCase {
                // TC1: futures trade, ASK aggressor
                input: json!({
                    "data": {"s": "btc_usdt", "t": 1700000000000i64, "p": "30000.1",
                             "m": "ASK", "a": "0.07"}
                }),
                expected: (Side::Sell, 0.07),
            },
            TestCase {
                // TC2: spot trade, buyer is maker
                input: json!({
                    "data": {"s": "btc_usdt", "t": 1700000000000i64, "p": "30000.1",
                             "b": true, "q": "0.09"}
                }),
                expected: (Side::Sell, 0.09),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = Xt.aggtrades_message(&test.input).unwrap();
            assert_eq!(actual[0].side, test.expected.0, "TC{index} failed");
            assert_eq!(actual[0].amount, test.expected.1, "TC{index} failed");
        }
    }

    #[test]
    fn test_xt_ticker_24h_lowercase_suffix() {
        let raw = json!({
            "result": [
                {"s": "btc_usdt", "cr": "0.0123", "v": "30000000"},
                {"s": "btc_eur", "cr": "0.01", "v": "1"}
            ]
        });

        let actual = Xt.ticker_24h(&raw, true).unwrap();
        assert_eq!(actual.len(), 1);
        assert_eq!(actual[&SmolStr::new("btc_usdt")].change_pct, 1.23);
    }
}
