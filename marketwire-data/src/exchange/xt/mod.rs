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
use std::time::Duration;
use url::Url;

/// Normalisation of raw XT payloads into the unified record family.
pub mod adapter;

/// XT spot & futures snapshot client.
pub mod client;

pub use client::XtClient;

/// [`Xt`] spot server base url.
pub const WS_BASE_URL_XT_SPOT: &str = "wss://stream.xt.com/public";

/// [`Xt`] futures server base url.
pub const WS_BASE_URL_XT_FUTURES: &str = "wss://fstream.xt.com/ws/market";

/// XT drops quiet connections fast; the socket manager pings every 10 seconds.
const PING_INTERVAL: Duration = Duration::from_secs(10);

/// [`Xt`] venue - comma-joined ticker subscription in one JSON frame, literal `"ping"`
/// heartbeat.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Xt;

impl VenueBinding for Xt {
    fn venue(&self) -> Venue {
        Venue::Xt
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        let base = match spec.market {
            MarketType::Spot => WS_BASE_URL_XT_SPOT,
            MarketType::Futures => WS_BASE_URL_XT_FUTURES,
        };
        Url::parse(base).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        let stream = format!("{}@{}", spec.topic, spec.tickers().join(","));
        Ok(vec![WsMessage::text(
            json!({
                "method": "subscribe",
                "params": [stream],
                "id": Utc::now().timestamp_millis().to_string(),
            })
            .to_string(),
        )])
    }

    fn ping_payload(&self, _spec: &SubscriptionSpec) -> Option<WsMessage> {
        Some(WsMessage::text("ping"))
    }
}

impl SocketManager for Xt {
    fn venue(&self) -> Venue {
        Venue::Xt
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let options = SessionOptions {
            ping_interval: PING_INTERVAL,
            ..options
        };
        let spec = SubscriptionSpec::new(
            Venue::Xt,
            market,
            "trade",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Xt, callback))
    }

    // XT serves no kline, ticker or liquidation streams here - NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xt_subscribe_joins_tickers() {
        let spec = SubscriptionSpec::new(
            Venue::Xt,
            MarketType::Spot,
            "trade",
            Some(vec![SmolStr::new("btc_usdt"), SmolStr::new("eth_usdt")]),
        );

        let payloads = Xt.subscribe_payloads(&spec).unwrap();
        assert!(
            payloads[0]
                .to_text()
                .unwrap()
                .contains(r#""params":["trade@btc_usdt,eth_usdt"]"#)
        );
    }
}
