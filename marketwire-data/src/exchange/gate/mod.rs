use crate::{
    error::DataError,
    exchange::{SocketManager, require_tickers},
    session::{VenueBinding, WsSession},
    subscription::{SessionOptions, StreamCallback, SubscriptionSpec},
};
use chrono::Utc;
use marketwire_instrument::{MarketType, Venue};
use marketwire_integration::protocol::websocket::WsMessage;
use serde_json::json;
use smol_str::SmolStr;
use url::Url;

/// Normalisation of raw Gate payloads into the unified record family.
pub mod adapter;

/// Gate spot & USDT-settled futures snapshot client.
pub mod client;

pub use client::GateClient;

/// [`Gate`] spot server base url.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/ws/en/>
pub const WS_BASE_URL_GATE_SPOT: &str = "wss://api.gateio.ws/ws/v4/";

/// [`Gate`] USDT-settled futures server base url.
pub const WS_BASE_URL_GATE_FUTURES: &str = "wss://fx-ws.gateio.ws/v4/ws/usdt";

/// Rewrite `BTCUSDT` into Gate's `BTC_USDT` form, leaving already-underscored pairs untouched.
pub(crate) fn gate_symbol(ticker: &str) -> String {
    if ticker.ends_with("_USDT") {
        ticker.to_string()
    } else {
        ticker.replace("USDT", "_USDT")
    }
}

/// [`Gate`] venue - time-stamped channel subscriptions and a channel-specific ping
/// (`spot.ping`/`futures.ping`).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Gate;

impl VenueBinding for Gate {
    fn venue(&self) -> Venue {
        Venue::Gate
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        let base = match spec.market {
            MarketType::Spot => WS_BASE_URL_GATE_SPOT,
            MarketType::Futures => WS_BASE_URL_GATE_FUTURES,
        };
        Url::parse(base).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        let payload = spec
            .tickers()
            .iter()
            .map(|ticker| gate_symbol(ticker))
            .collect::<Vec<_>>();

        Ok(vec![WsMessage::text(
            json!({
                "time": Utc::now().timestamp(),
                "channel": spec.topic,
                "event": "subscribe",
                "payload": payload,
            })
            .to_string(),
        )])
    }

    fn ping_payload(&self, spec: &SubscriptionSpec) -> Option<WsMessage> {
        let channel = match spec.market {
            MarketType::Spot => "spot.ping",
            MarketType::Futures => "futures.ping",
        };
        Some(WsMessage::text(
            json!({
                "time": Utc::now().timestamp(),
                "channel": channel,
            })
            .to_string(),
        ))
    }
}

impl SocketManager for Gate {
    fn venue(&self) -> Venue {
        Venue::Gate
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let topic = match market {
            MarketType::Spot => "spot.trades",
            MarketType::Futures => "futures.trades",
        };
        let spec = SubscriptionSpec::new(
            Venue::Gate,
            market,
            topic,
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Gate, callback))
    }

    // Gate serves no kline, ticker or liquidation streams here - NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_symbol() {
        assert_eq!(gate_symbol("BTCUSDT"), "BTC_USDT");
        assert_eq!(gate_symbol("BTC_USDT"), "BTC_USDT");
    }

    #[test]
    fn test_gate_ping_channel_follows_market() {
        let spot = SubscriptionSpec::new(Venue::Gate, MarketType::Spot, "spot.trades", None);
        let ping = Gate.ping_payload(&spot).unwrap();
        assert!(ping.to_text().unwrap().contains(r#""channel":"spot.ping""#));

        let futures =
            SubscriptionSpec::new(Venue::Gate, MarketType::Futures, "futures.trades", None);
        let ping = Gate.ping_payload(&futures).unwrap();
        assert!(
            ping.to_text()
                .unwrap()
                .contains(r#""channel":"futures.ping""#)
        );
    }
}
