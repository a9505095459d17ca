use crate::error::AdaptError;
use marketwire_instrument::{Side, Venue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

/// Normalised 24-hour summary for a single symbol.
///
/// `change_pct` is a percent (never a fraction) rounded to two decimal places; `quote_volume`
/// is denominated in the quote asset (USDT in this system).
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct TickerDaily {
    pub change_pct: f64,
    pub quote_volume: f64,
}

impl TickerDaily {
    /// Construct from a raw percent value, applying the canonical 2dp rounding.
    pub fn new(change_pct: f64, quote_volume: f64) -> Self {
        Self {
            change_pct: round2(change_pct),
            quote_volume,
        }
    }

    /// Construct from the fraction venues such as Bybit or Bitget report (eg/ `0.0123`),
    /// scaling to percent before rounding.
    pub fn from_fraction(change_fraction: f64, quote_volume: f64) -> Self {
        Self::new(change_fraction * 100.0, quote_volume)
    }
}

/// Normalised open interest snapshot. `value` is denominated in base-asset units, never in
/// contracts - contract-denominated venues must run the contract-size fix first.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct OpenInterest {
    /// Unix milliseconds.
    pub time: i64,
    /// Base-asset units.
    pub value: f64,
}

/// Normalised OHLCV bar.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct Kline {
    pub symbol: SmolStr,
    /// Bar open time, Unix milliseconds.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Quote volume in USDT terms.
    pub quote_volume: f64,
    /// Venue interval token the bar was requested with, where the message carries one.
    pub interval: Option<SmolStr>,
    /// Bar close time, Unix milliseconds, where the venue reports one.
    pub close_time: Option<i64>,
    /// Whether the bar is closed, where the venue reports it.
    pub closed: Option<bool>,
}

/// Normalised aggregated trade. `amount` is in base-asset units.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct AggTrade {
    /// Unix milliseconds.
    pub time: i64,
    pub symbol: SmolStr,
    pub side: Side,
    pub price: f64,
    /// Base-asset units.
    pub amount: f64,
}

/// Normalised forced liquidation.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct Liquidation {
    /// Unix milliseconds.
    pub time: i64,
    pub symbol: SmolStr,
    pub side: Side,
    /// Base-asset units.
    pub amount: f64,
    pub price: f64,
}

/// A single price level of an order-book snapshot.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct DepthLevel {
    pub price: f64,
    pub amount: f64,
}

/// Normalised order-book snapshot with canonical ordering: asks ascending by price, bids
/// descending by price, regardless of venue wire order.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct Depth {
    pub asks: Vec<DepthLevel>,
    pub bids: Vec<DepthLevel>,
}

impl Depth {
    /// Parse raw `[price, size]` string-pair levels and sort them into canonical order.
    ///
    /// This is the shared helper every venue depth adapter funnels through; malformed input
    /// surfaces as [`AdaptError`].
    pub fn from_raw_levels(venue: Venue, asks: &Value, bids: &Value) -> Result<Self, AdaptError> {
        let mut asks = parse_levels(venue, asks)?;
        let mut bids = parse_levels(venue, bids)?;

        asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));

        Ok(Self { asks, bids })
    }
}

fn parse_levels(venue: Venue, raw: &Value) -> Result<Vec<DepthLevel>, AdaptError> {
    let rows = raw
        .as_array()
        .ok_or_else(|| AdaptError::new(venue, format!("depth levels are not an array: {raw}")))?;

    rows.iter()
        .map(|row| {
            let level = row
                .as_array()
                .filter(|entry| entry.len() >= 2)
                .ok_or_else(|| {
                    AdaptError::new(venue, format!("malformed depth level: {row}"))
                })?;

            Ok(DepthLevel {
                price: value_as_f64(venue, &level[0])?,
                amount: value_as_f64(venue, &level[1])?,
            })
        })
        .collect()
}

/// Extract an `f64` from a JSON value the venue ships either as a number or a numeric string.
pub fn value_as_f64(venue: Venue, raw: &Value) -> Result<f64, AdaptError> {
    match raw {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| AdaptError::new(venue, format!("non-finite number: {raw}"))),
        Value::String(string) => string
            .parse::<f64>()
            .map_err(|_| AdaptError::new(venue, format!("unparseable number: {string}"))),
        other => Err(AdaptError::new(
            venue,
            format!("expected number or numeric string, got: {other}"),
        )),
    }
}

/// Round a percent value to the canonical two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_depth_from_raw_levels_sorts_canonically() {
        // Wire order deliberately scrambled in both books
        let raw = json!({
            "asks": [["100", "1"], ["99", "2"]],
            "bids": [["97", "1"], ["98", "3"]],
        });

        let depth = Depth::from_raw_levels(Venue::Binance, &raw["asks"], &raw["bids"]).unwrap();

        assert_eq!(
            depth.asks,
            vec![
                DepthLevel { price: 99.0, amount: 2.0 },
                DepthLevel { price: 100.0, amount: 1.0 },
            ]
        );
        assert_eq!(
            depth.bids,
            vec![
                DepthLevel { price: 98.0, amount: 3.0 },
                DepthLevel { price: 97.0, amount: 1.0 },
            ]
        );
    }

    #[test]
    fn test_depth_from_raw_levels_malformed() {
        let raw = json!({
            "asks": [["100"]],
            "bids": [],
        });
        assert!(Depth::from_raw_levels(Venue::Binance, &raw["asks"], &raw["bids"]).is_err());

        let raw = json!({
            "asks": [["abc", "1"]],
            "bids": [],
        });
        assert!(Depth::from_raw_levels(Venue::Binance, &raw["asks"], &raw["bids"]).is_err());
    }

    #[test]
    fn test_ticker_daily_percent_rounding() {
        assert_eq!(TickerDaily::new(1.2345, 0.0).change_pct, 1.23);
        assert_eq!(TickerDaily::from_fraction(0.0123456, 0.0).change_pct, 1.23);
        assert_eq!(TickerDaily::new(-0.005, 0.0).change_pct, -0.01);
    }
}
