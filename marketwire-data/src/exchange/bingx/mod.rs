use crate::{
    error::DataError,
    exchange::{SocketManager, require_tickers},
    session::{FrameOutcome, VenueBinding, WsSession, binding::decode_json_frame},
    subscription::{SessionOptions, StreamCallback, SubscriptionSpec},
};
use marketwire_instrument::{MarketType, Venue};
use marketwire_integration::{
    error::SocketError,
    protocol::websocket::{WsMessage, decompress_gzip_frame},
};
use serde_json::json;
use smol_str::SmolStr;
use url::Url;

/// Normalisation of raw BingX payloads into the unified record family.
pub mod adapter;

/// BingX spot & swap snapshot client.
pub mod client;

pub use client::BingxClient;

/// [`Bingx`] spot market server base url.
pub const WS_BASE_URL_BINGX_SPOT: &str = "wss://open-api-ws.bingx.com/market";

/// [`Bingx`] swap market server base url.
pub const WS_BASE_URL_BINGX_FUTURES: &str = "wss://open-api-swap.bingx.com/swap-market";

/// [`Bingx`] venue - gzip-compressed frames, one subscription frame per ticker, and an
/// application-level `"Ping"` that must be answered with `"Pong"` on the socket.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Bingx;

impl VenueBinding for Bingx {
    fn venue(&self) -> Venue {
        Venue::Bingx
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        let base = match spec.market {
            MarketType::Spot => WS_BASE_URL_BINGX_SPOT,
            MarketType::Futures => WS_BASE_URL_BINGX_FUTURES,
        };
        Url::parse(base).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        Ok(spec
            .tickers()
            .iter()
            .map(|ticker| {
                WsMessage::text(
                    json!({
                        "reqType": "sub",
                        "dataType": format!("{}@{}", ticker.to_uppercase(), spec.topic),
                    })
                    .to_string(),
                )
            })
            .collect())
    }

    fn decode_frame(
        &self,
        _spec: &SubscriptionSpec,
        message: WsMessage,
    ) -> Result<FrameOutcome, SocketError> {
        let text = match message {
            WsMessage::Binary(payload) => decompress_gzip_frame(&payload)?,
            WsMessage::Text(payload) => payload.to_string(),
            other => return decode_json_frame(other),
        };

        // Application-level keep-alive: the server's "Ping" must be answered with "Pong"
        if text.trim() == "Ping" {
            return Ok(FrameOutcome::Reply(WsMessage::text("Pong")));
        }
        if text.trim() == "Pong" {
            return Ok(FrameOutcome::Heartbeat);
        }

        serde_json::from_str(&text)
            .map(FrameOutcome::Payload)
            .map_err(|error| SocketError::Deserialise {
                error,
                payload: text,
            })
    }
}

impl SocketManager for Bingx {
    fn venue(&self) -> Venue {
        Venue::Bingx
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Bingx,
            market,
            "trade",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Bingx, callback))
    }

    // No kline, ticker or liquidation streams here - NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    fn gzip(payload: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_bingx_decode_gzip_payload() {
        let spec = SubscriptionSpec::new(Venue::Bingx, MarketType::Futures, "trade", None);
        let frame = WsMessage::binary(gzip(br#"{"dataType":"BTC-USDT@trade","data":[]}"#));

        let actual = Bingx.decode_frame(&spec, frame).unwrap();
        assert!(matches!(actual, FrameOutcome::Payload(_)));
    }

    #[test]
    fn test_bingx_answers_ping_with_pong() {
        let spec = SubscriptionSpec::new(Venue::Bingx, MarketType::Futures, "trade", None);

        let actual = Bingx
            .decode_frame(&spec, WsMessage::binary(gzip(b"Ping")))
            .unwrap();
        let FrameOutcome::Reply(reply) = actual else {
            panic!("expected Reply, got {actual:?}");
        };
        assert_eq!(reply.to_text().unwrap(), "Pong");
    }

    #[test]
    fn test_bingx_one_subscription_frame_per_ticker() {
        let spec = SubscriptionSpec::new(
            Venue::Bingx,
            MarketType::Futures,
            "trade",
            Some(vec![SmolStr::new("btc-usdt"), SmolStr::new("eth-usdt")]),
        );

        let payloads = Bingx.subscribe_payloads(&spec).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"dataType":"BTC-USDT@trade","reqType":"sub"}"#
        );
    }
}
