use crate::{error::DataError, subscription::SubscriptionSpec};
use marketwire_instrument::Venue;
use marketwire_integration::{
    error::SocketError,
    protocol::websocket::{WsMessage, process_binary, process_text},
};
use serde_json::Value;
use url::Url;

/// Outcome of decoding one inbound WebSocket frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// A decoded payload to enqueue for the worker pool.
    Payload(Value),
    /// A textual heartbeat ("ping"/"pong") - logged at debug level, never enqueued.
    Heartbeat,
    /// An application-level ping that must be answered on the socket (eg/ BingX `"Ping"`).
    Reply(WsMessage),
    /// A transport control frame already handled by tungstenite.
    Ignore,
    /// The venue sent a close frame; the session reconnects.
    Disconnect(String),
}

/// Venue protocol binding - how one venue derives its connection URI, subscription payloads,
/// custom ping payload and inbound framing.
///
/// Bindings are stateless and pure; all mutable state lives in the
/// [`WsSession`](super::WsSession). One implementation exists per venue, registered in
/// [`registry`](crate::registry).
pub trait VenueBinding: Send + Sync {
    fn venue(&self) -> Venue;

    /// Compute the connection [`Url`] from the subscription parameters.
    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError>;

    /// Subscription payloads, each sent as a separate frame after connecting.
    ///
    /// Venues that carry the subscription in the URI (Binance) return an empty `Vec`; venues
    /// that reject batched subscriptions (KCEX, BingX) return one frame per ticker.
    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError>;

    /// Custom application-level ping payload, `None` when the transport-level PING/PONG
    /// suffices. Invoked at every tick so time-stamped payloads stay fresh.
    fn ping_payload(&self, _spec: &SubscriptionSpec) -> Option<WsMessage> {
        None
    }

    /// Decode one inbound frame. The default decodes JSON text/binary payloads and classifies
    /// bare `"ping"`/`"pong"` strings as heartbeats; venues with a custom framing layer
    /// (gzip, protobuf, application-level ping text) override this.
    fn decode_frame(
        &self,
        _spec: &SubscriptionSpec,
        message: WsMessage,
    ) -> Result<FrameOutcome, SocketError> {
        decode_json_frame(message)
    }
}

/// Default inbound framing: JSON text/binary with textual heartbeat classification.
pub fn decode_json_frame(message: WsMessage) -> Result<FrameOutcome, SocketError> {
    match message {
        WsMessage::Text(payload) => {
            if is_heartbeat(&payload) {
                return Ok(FrameOutcome::Heartbeat);
            }
            process_text::<Value>(payload).map(FrameOutcome::Payload)
        }
        WsMessage::Binary(payload) => process_binary::<Value>(&payload).map(FrameOutcome::Payload),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Ok(FrameOutcome::Ignore),
        WsMessage::Close(close_frame) => {
            Ok(FrameOutcome::Disconnect(format!("{close_frame:?}")))
        }
    }
}

/// Venue heartbeat strings that must not be decoded as JSON.
pub fn is_heartbeat(payload: &str) -> bool {
    matches!(payload.trim(), "ping" | "pong" | "Ping" | "Pong")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_frame() {
        let actual = decode_json_frame(WsMessage::text(r#"{"topic":"t"}"#)).unwrap();
        assert!(matches!(actual, FrameOutcome::Payload(_)));

        let actual = decode_json_frame(WsMessage::text("pong")).unwrap();
        assert!(matches!(actual, FrameOutcome::Heartbeat));

        let actual = decode_json_frame(WsMessage::text("not json"));
        assert!(actual.is_err());

        let actual = decode_json_frame(WsMessage::Close(None)).unwrap();
        assert!(matches!(actual, FrameOutcome::Disconnect(_)));
    }
}
