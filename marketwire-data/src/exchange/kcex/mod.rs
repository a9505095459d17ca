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
use std::time::Duration;
use url::Url;

/// Normalisation of raw KCEX payloads into the unified record family.
pub mod adapter;

/// KCEX futures snapshot client.
pub mod client;

pub use client::KcexClient;

/// [`Kcex`] futures server base url - the only market served.
pub const WS_BASE_URL_KCEX_FUTURES: &str = "wss://www.kcex.com/fapi/edge";

/// KCEX drops quiet connections fast; the socket manager pings every 10 seconds.
const PING_INTERVAL: Duration = Duration::from_secs(10);

/// [`Kcex`] venue - one subscription frame per ticker (batched params are rejected),
/// `{"method":"ping"}` heartbeat. Futures only.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Kcex;

impl VenueBinding for Kcex {
    fn venue(&self) -> Venue {
        Venue::Kcex
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        if spec.market != MarketType::Futures {
            return Err(DataError::MarketMismatch {
                venue: Venue::Kcex,
                market: spec.market,
            });
        }
        Url::parse(WS_BASE_URL_KCEX_FUTURES).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        Ok(spec
            .tickers()
            .iter()
            .map(|ticker| {
                WsMessage::text(
                    json!({
                        "method": spec.topic,
                        "param": {
                            "symbol": ticker.as_str(),
                            "compress": true,
                        },
                    })
                    .to_string(),
                )
            })
            .collect())
    }

    fn ping_payload(&self, _spec: &SubscriptionSpec) -> Option<WsMessage> {
        Some(WsMessage::text(json!({"method": "ping"}).to_string()))
    }
}

impl SocketManager for Kcex {
    fn venue(&self) -> Venue {
        Venue::Kcex
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
                venue: Venue::Kcex,
                market,
            });
        }
        let options = SessionOptions {
            ping_interval: PING_INTERVAL,
            ..options
        };
        let spec = SubscriptionSpec::new(
            Venue::Kcex,
            market,
            "sub.deal",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Kcex, callback))
    }

    // No kline, ticker or liquidation streams here - NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kcex_one_frame_per_ticker() {
        let spec = SubscriptionSpec::new(
            Venue::Kcex,
            MarketType::Futures,
            "sub.deal",
            Some(vec![SmolStr::new("BTC_USDT"), SmolStr::new("ETH_USDT")]),
        );

        let payloads = Kcex.subscribe_payloads(&spec).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(
            payloads[1].to_text().unwrap(),
            r#"{"method":"sub.deal","param":{"compress":true,"symbol":"ETH_USDT"}}"#
        );
    }
}
