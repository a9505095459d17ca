use crate::error::SocketError;
use bytes::Bytes;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use std::{fmt::Debug, io::Read};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, connect_async,
    tungstenite::{Utf8Bytes, client::IntoClientRequest, error::ProtocolError},
};
use tracing::debug;

/// Convenient type alias for a tungstenite `WebSocketStream`.
pub type WebSocket = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Convenient type alias for the `Sink` half of a tungstenite [`WebSocket`].
pub type WsSink = futures::stream::SplitSink<WebSocket, WsMessage>;

/// Convenient type alias for the `Stream` half of a tungstenite [`WebSocket`].
pub type WsStream = futures::stream::SplitStream<WebSocket>;

/// Communicative type alias for a tungstenite [`WebSocket`] `Message`.
pub type WsMessage = tokio_tungstenite::tungstenite::Message;

/// Communicative type alias for a tungstenite [`WebSocket`] `Error`.
pub type WsError = tokio_tungstenite::tungstenite::Error;

/// Process a payload of `String` by deserialising into an `ExchangeMessage`.
pub fn process_text<ExchangeMessage>(
    payload: Utf8Bytes,
) -> Result<ExchangeMessage, SocketError>
where
    ExchangeMessage: DeserializeOwned,
{
    serde_json::from_str::<ExchangeMessage>(&payload).map_err(|error| {
        debug!(
            ?error,
            ?payload,
            "failed to deserialize WebSocket Message into domain specific Message"
        );
        SocketError::Deserialise {
            error,
            payload: payload.to_string(),
        }
    })
}

/// Process a payload of `Bytes` by deserialising into an `ExchangeMessage`.
pub fn process_binary<ExchangeMessage>(payload: &Bytes) -> Result<ExchangeMessage, SocketError>
where
    ExchangeMessage: DeserializeOwned,
{
    serde_json::from_slice::<ExchangeMessage>(payload).map_err(|error| {
        debug!(
            ?error,
            ?payload,
            "failed to deserialize WebSocket Message into domain specific Message"
        );
        SocketError::DeserialiseBinary {
            error,
            payload: payload.to_vec(),
        }
    })
}

/// Decompress a gzip compressed binary frame into its textual payload.
///
/// Some venues (eg/ BingX) gzip every frame; a payload that is not actually gzip is returned
/// as utf-8 text unchanged.
pub fn decompress_gzip_frame(payload: &Bytes) -> Result<String, SocketError> {
    let mut decoder = GzDecoder::new(payload.as_ref());
    let mut decompressed = String::new();
    match decoder.read_to_string(&mut decompressed) {
        Ok(_) => Ok(decompressed),
        // Not a gzip member - fall back to treating the payload as plain utf-8
        Err(error) => {
            String::from_utf8(payload.to_vec()).map_err(|_| SocketError::Decompress(error))
        }
    }
}

/// Connect asynchronously to a [`WebSocket`] server.
pub async fn connect<R>(request: R) -> Result<WebSocket, SocketError>
where
    R: IntoClientRequest + Unpin + Debug,
{
    debug!(?request, "attempting to establish WebSocket connection");
    connect_async(request)
        .await
        .map(|(websocket, _)| websocket)
        .map_err(|error| SocketError::WebSocket(Box::new(error)))
}

/// Determine whether a [`WsError`] indicates the [`WebSocket`] has disconnected.
pub fn is_websocket_disconnected(error: &WsError) -> bool {
    matches!(
        error,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Io(_)
            | WsError::Protocol(ProtocolError::SendAfterClosing)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    #[test]
    fn test_process_text() {
        let actual = process_text::<serde_json::Value>(Utf8Bytes::from_static(r#"{"op":"pong"}"#));
        assert_eq!(actual.unwrap(), serde_json::json!({"op": "pong"}));

        let actual = process_text::<serde_json::Value>(Utf8Bytes::from_static("ping"));
        assert!(matches!(actual, Err(SocketError::Deserialise { .. })));
    }

    #[test]
    fn test_decompress_gzip_frame() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"dataType":"BTC-USDT@trade"}"#).unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());

        assert_eq!(
            decompress_gzip_frame(&compressed).unwrap(),
            r#"{"dataType":"BTC-USDT@trade"}"#
        );

        // Uncompressed payloads pass through unchanged
        assert_eq!(
            decompress_gzip_frame(&Bytes::from_static(b"Ping")).unwrap(),
            "Ping"
        );
    }
}
