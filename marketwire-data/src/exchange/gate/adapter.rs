use crate::{
    adapter::{SymbolMap, VenueAdapter, from_raw},
    error::AdaptError,
    records::{AggTrade, Depth, TickerDaily},
};
use marketwire_instrument::{Side, Venue};
use marketwire_integration::de::{de_flexible_epoch_ms, de_str};
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use super::Gate;

/// ### Raw Payload Examples
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#get-details-of-a-specifc-currency-pair>
/// ```json
/// {"currency_pair":"BTC_USDT","change_percentage":"1.23","quote_volume":"30000000", ...}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct GateSpotTicker {
    currency_pair: SmolStr,
    #[serde(deserialize_with = "de_str")]
    change_percentage: f64,
    #[serde(deserialize_with = "de_str")]
    quote_volume: f64,
}

/// ```json
/// {"contract":"BTC_USDT","change_percentage":"1.23","volume_24h_quote":"30000000", ...}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct GateFuturesTicker {
    contract: SmolStr,
    #[serde(deserialize_with = "de_str")]
    change_percentage: f64,
    #[serde(deserialize_with = "de_str")]
    volume_24h_quote: f64,
}

/// Futures trade row - negative `size` is a sell.
///
/// ### Raw Payload Examples
/// See docs: <https://www.gate.io/docs/developers/futures/ws/en/#trades-notification>
/// ```json
/// {"channel":"futures.trades","event":"update","result":[{"id":1,"contract":"BTC_USDT",
///  "create_time_ms":1700000000000,"price":"30000.1","size":-5}]}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct GateFuturesTradeMessage {
    result: Vec<GateFuturesTrade>,
}

#[derive(Clone, Debug, Deserialize)]
struct GateFuturesTrade {
    contract: SmolStr,
    #[serde(deserialize_with = "de_flexible_epoch_ms")]
    create_time_ms: i64,
    #[serde(deserialize_with = "de_str")]
    price: f64,
    size: f64,
}

/// Spot trade row - one trade per message.
///
/// ```json
/// {"channel":"spot.trades","event":"update","result":{"id":1,"create_time_ms":"1700000000123.0",
///  "currency_pair":"BTC_USDT","side":"buy","amount":"0.05","price":"30000.1"}}
/// ```
#[derive(Clone, Debug, Deserialize)]
struct GateSpotTradeMessage {
    result: GateSpotTrade,
}

#[derive(Clone, Debug, Deserialize)]
struct GateSpotTrade {
    currency_pair: SmolStr,
    #[serde(deserialize_with = "de_flexible_epoch_ms")]
    create_time_ms: i64,
    side: Side,
    #[serde(deserialize_with = "de_str")]
    amount: f64,
    #[serde(deserialize_with = "de_str")]
    price: f64,
}

impl VenueAdapter for Gate {
    fn venue(&self) -> Venue {
        Venue::Gate
    }

    fn tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let rows: Vec<GateSpotTicker> = from_raw(Venue::Gate, raw)?;
        Ok(rows
            .into_iter()
            .map(|row| row.currency_pair)
            .filter(|symbol| !only_usdt || symbol.ends_with("USDT"))
            .collect())
    }

    fn futures_tickers(&self, raw: &Value, only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        let rows: Vec<GateFuturesTicker> = from_raw(Venue::Gate, raw)?;
        Ok(rows
            .into_iter()
            .map(|row| row.contract)
            .filter(|symbol| !only_usdt || symbol.ends_with("_USDT"))
            .collect())
    }

    /// Gate already reports the change in percent.
    fn ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let rows: Vec<GateSpotTicker> = from_raw(Venue::Gate, raw)?;
        Ok(rows
            .into_iter()
            .filter(|row| !only_usdt || row.currency_pair.ends_with("USDT"))
            .map(|row| {
                (
                    row.currency_pair,
                    TickerDaily::new(row.change_percentage, row.quote_volume),
                )
            })
            .collect())
    }

    fn futures_ticker_24h(
        &self,
        raw: &Value,
        only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        let rows: Vec<GateFuturesTicker> = from_raw(Venue::Gate, raw)?;
        Ok(rows
            .into_iter()
            .filter(|row| !only_usdt || row.contract.ends_with("_USDT"))
            .map(|row| {
                (
                    row.contract,
                    TickerDaily::new(row.change_percentage, row.volume_24h_quote.trunc()),
                )
            })
            .collect())
    }

    /// Streaming trades collapse `BTC_USDT` to `BTCUSDT` - downstream consumers key the Gate
    /// trade feed on the separator-free form.
    fn aggtrades_message(&self, raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        match raw.get("channel").and_then(Value::as_str) {
            Some("futures.trades") => {
                let message: GateFuturesTradeMessage = from_raw(Venue::Gate, raw)?;
                Ok(message
                    .result
                    .into_iter()
                    .map(|trade| AggTrade {
                        time: trade.create_time_ms,
                        symbol: SmolStr::new(trade.contract.replace('_', "")),
                        side: if trade.size >= 0.0 { Side::Buy } else { Side::Sell },
                        price: trade.price,
                        amount: trade.size.abs(),
                    })
                    .collect())
            }
            Some("spot.trades") => {
                let message: GateSpotTradeMessage = from_raw(Venue::Gate, raw)?;
                let trade = message.result;
                Ok(vec![AggTrade {
                    time: trade.create_time_ms,
                    symbol: SmolStr::new(trade.currency_pair.replace('_', "")),
                    side: trade.side,
                    price: trade.price,
                    amount: trade.amount,
                }])
            }
            other => Err(AdaptError::new(
                Venue::Gate,
                format!("unknown trade channel: {other:?}"),
            )),
        }
    }

    fn depth(&self, raw: &Value) -> Result<Depth, AdaptError> {
        Depth::from_raw_levels(Venue::Gate, &raw["asks"], &raw["bids"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gate_futures_trade_sign_encodes_side() {
        let raw = json!({
            "channel": "futures.trades",
            "event": "update",
            "result": [
                {"id": 1, "contract": "BTC_USDT", "create_time_ms": 1700000000000i64,
                 "price": "30000.1", "size": -5.0},
                {"id": 2, "contract": "BTC_USDT", "create_time_ms": 1700000000001i64,
                 "price": "30000.2", "size": 3.0}
            ]
        });

        let actual = Gate.aggtrades_message(&raw).unwrap();

        assert_eq!(actual[0].side, Side::Sell);
        assert_eq!(actual[0].amount, 5.0);
        assert_eq!(actual[0].symbol, SmolStr::new("BTCUSDT"));
        assert_eq!(actual[1].side, Side::Buy);
    }

    #[test]
    fn test_gate_spot_trade_message() {
        let raw = json!({
            "channel": "spot.trades",
            "event": "update",
            "result": {"id": 1, "create_time_ms": "1700000000123.0",
                       "currency_pair": "BTC_USDT", "side": "buy",
                       "amount": "0.05", "price": "30000.1"}
        });

        let actual = Gate.aggtrades_message(&raw).unwrap();

        assert_eq!(
            actual,
            vec![AggTrade {
                time: 1700000000123,
                symbol: SmolStr::new("BTCUSDT"),
                side: Side::Buy,
                price: 30000.1,
                amount: 0.05,
            }]
        );
    }

    #[test]
    fn test_gate_unknown_channel_is_adapt_failure() {
        let raw = json!({"channel": "spot.pong", "result": {}});
        assert!(Gate.aggtrades_message(&raw).is_err());
    }
}
