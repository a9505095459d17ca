use crate::{
    error::DataError,
    exchange::{SocketManager, require_tickers},
    session::{VenueBinding, WsSession},
    subscription::{SessionOptions, StreamCallback, SubscriptionSpec},
};
use marketwire_instrument::{MarketType, Venue};
use marketwire_integration::protocol::websocket::WsMessage;
use serde_json::json;
use smol_str::SmolStr;
use url::Url;

/// Normalisation of raw Hyperliquid payloads into the unified record family.
pub mod adapter;

/// Hyperliquid info-endpoint snapshot client.
pub mod client;

pub use client::HyperliquidClient;

/// [`Hyperliquid`] server base url - one server for every market.
///
/// See docs: <https://hyperliquid.gitbook.io/hyperliquid-docs/for-developers/api/websocket>
pub const WS_BASE_URL_HYPERLIQUID: &str = "wss://api.hyperliquid.xyz/ws";

/// [`Hyperliquid`] venue - one subscription frame per coin, transport-level PING/PONG.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Hyperliquid;

impl VenueBinding for Hyperliquid {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    fn connection_uri(&self, _spec: &SubscriptionSpec) -> Result<Url, DataError> {
        Url::parse(WS_BASE_URL_HYPERLIQUID).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        Ok(spec
            .tickers()
            .iter()
            .map(|ticker| {
                WsMessage::text(
                    json!({
                        "method": "subscribe",
                        "subscription": {
                            "type": spec.topic,
                            "coin": ticker.as_str(),
                        },
                    })
                    .to_string(),
                )
            })
            .collect())
    }
}

impl SocketManager for Hyperliquid {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Hyperliquid,
            market,
            "trades",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Hyperliquid, callback))
    }

    // No kline, ticker or liquidation streams here - NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyperliquid_subscribe_per_coin() {
        let spec = SubscriptionSpec::new(
            Venue::Hyperliquid,
            MarketType::Futures,
            "trades",
            Some(vec![SmolStr::new("BTC"), SmolStr::new("ETH")]),
        );

        let payloads = Hyperliquid.subscribe_payloads(&spec).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"method":"subscribe","subscription":{"coin":"BTC","type":"trades"}}"#
        );
    }
}
