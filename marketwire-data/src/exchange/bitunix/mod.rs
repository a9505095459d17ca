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

/// Normalisation of raw Bitunix payloads into the unified record family.
pub mod adapter;

/// Bitunix futures snapshot client.
pub mod client;

pub use client::BitunixClient;

/// [`Bitunix`] futures public server base url - the only market served here.
pub const WS_BASE_URL_BITUNIX_FUTURES: &str = "wss://fapi.bitunix.com/public/";

/// [`Bitunix`] venue - symbol/channel subscription args in one JSON frame, time-stamped
/// `{"op":"ping"}` heartbeat. Futures only.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Bitunix;

impl VenueBinding for Bitunix {
    fn venue(&self) -> Venue {
        Venue::Bitunix
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        if spec.market != MarketType::Futures {
            return Err(DataError::MarketMismatch {
                venue: Venue::Bitunix,
                market: spec.market,
            });
        }
        Url::parse(WS_BASE_URL_BITUNIX_FUTURES)
            .map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        let args = spec
            .tickers()
            .iter()
            .map(|ticker| json!({"symbol": ticker.as_str(), "ch": spec.topic}))
            .collect::<Vec<_>>();

        Ok(vec![WsMessage::text(
            json!({
                "op": "subscribe",
                "args": args,
            })
            .to_string(),
        )])
    }

    fn ping_payload(&self, _spec: &SubscriptionSpec) -> Option<WsMessage> {
        Some(WsMessage::text(
            json!({
                "op": "ping",
                "ping": Utc::now().timestamp(),
            })
            .to_string(),
        ))
    }
}

impl SocketManager for Bitunix {
    fn venue(&self) -> Venue {
        Venue::Bitunix
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        if market != MarketType::Futures {
            return Err(DataError::MarketMismatch {
                venue: Venue::Bitunix,
                market,
            });
        }
        let spec = SubscriptionSpec::new(
            Venue::Bitunix,
            market,
            "trade",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Bitunix, callback))
    }

    // No kline, ticker or liquidation streams here - NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitunix_spot_is_a_market_mismatch() {
        let callback: crate::subscription::StreamCallback =
            std::sync::Arc::new(|_| Box::pin(async {}));
        let actual = Bitunix.aggtrades_socket(
            MarketType::Spot,
            &[SmolStr::new("BTCUSDT")],
            callback,
            SessionOptions::default(),
        );
        assert!(matches!(actual, Err(DataError::MarketMismatch { .. })));
    }

    #[test]
    fn test_bitunix_subscribe_payload() {
        let spec = SubscriptionSpec::new(
            Venue::Bitunix,
            MarketType::Futures,
            "trade",
            Some(vec![SmolStr::new("BTCUSDT")]),
        );
        let payloads = Bitunix.subscribe_payloads(&spec).unwrap();
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"args":[{"ch":"trade","symbol":"BTCUSDT"}],"op":"subscribe"}"#
        );
    }
}
