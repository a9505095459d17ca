//! Streaming session lifecycle behaviour, driven end-to-end against a local WebSocket server.

use futures::{SinkExt, StreamExt};
use marketwire_data::{
    error::DataError,
    session::{SessionState, VenueBinding, WsSession},
    subscription::{SessionOptions, StreamCallback, SubscriptionSpec},
};
use marketwire_instrument::{MarketType, Venue};
use marketwire_integration::protocol::websocket::WsMessage;
use serde_json::json;
use smol_str::SmolStr;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{net::TcpListener, sync::mpsc};
use url::Url;

/// Binding for a venue served by the local test listener.
struct LoopbackBinding {
    uri: String,
}

impl VenueBinding for LoopbackBinding {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn connection_uri(&self, _spec: &SubscriptionSpec) -> Result<Url, DataError> {
        Url::parse(&self.uri).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        Ok(vec![WsMessage::text(
            json!({"op": "subscribe", "topic": spec.topic}).to_string(),
        )])
    }
}

/// What the fake venue does on every accepted connection.
#[derive(Copy, Clone)]
enum ServerScript {
    /// Read the subscription, then send `count` trade frames and keep the socket open.
    SendFrames(usize),
    /// Read the subscription, then go silent forever.
    Silence,
}

async fn spawn_server(script: ServerScript) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let connections = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&connections);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            seen.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                let Ok(websocket) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let (mut sink, mut stream) = websocket.split();

                // First inbound frame is the subscription
                let Some(Ok(subscribe)) = stream.next().await else {
                    return;
                };
                assert!(subscribe.to_text().unwrap().contains("subscribe"));

                match script {
                    ServerScript::SendFrames(count) => {
                        for index in 0..count {
                            let frame = json!({"s": "BTCUSDT", "p": "30000", "i": index});
                            if sink.send(WsMessage::text(frame.to_string())).await.is_err() {
                                return;
                            }
                        }
                        // Keep the connection open; drain client frames
                        while let Some(Ok(_)) = stream.next().await {}
                    }
                    ServerScript::Silence => {
                        while let Some(Ok(_)) = stream.next().await {}
                    }
                }
            });
        }
    });

    (format!("ws://127.0.0.1:{port}"), connections)
}

fn loopback_session(
    uri: String,
    options: SessionOptions,
    callback: StreamCallback,
) -> WsSession {
    let binding: &'static LoopbackBinding = Box::leak(Box::new(LoopbackBinding { uri }));
    let spec = SubscriptionSpec::new(
        Venue::Binance,
        MarketType::Spot,
        "@aggTrade",
        Some(vec![SmolStr::new("BTCUSDT")]),
    )
    .with_options(options);
    WsSession::new(spec, binding, callback)
}

#[tokio::test]
async fn test_session_delivers_frames_and_stops_cleanly() {
    let (uri, _connections) = spawn_server(ServerScript::SendFrames(3)).await;

    let (delivered_tx, mut delivered_rx) = mpsc::unbounded_channel();
    let callback: StreamCallback = Arc::new(move |frame| {
        let delivered_tx = delivered_tx.clone();
        Box::pin(async move {
            let _ = delivered_tx.send(frame);
        })
    });

    let session = loopback_session(uri, SessionOptions::default(), callback);
    session.start().unwrap();

    // Double start while running is a precondition failure
    assert!(matches!(session.start(), Err(DataError::AlreadyRunning)));

    let mut received = Vec::new();
    for _ in 0..3 {
        let frame = tokio::time::timeout(Duration::from_secs(5), delivered_rx.recv())
            .await
            .expect("frame not delivered in time")
            .unwrap();
        received.push(frame);
    }
    assert_eq!(received[0]["s"], "BTCUSDT");

    session.stop().await;
    assert_eq!(session.state(), SessionState::Idle);

    // No callbacks fire after stop returns
    assert!(
        tokio::time::timeout(Duration::from_millis(300), delivered_rx.recv())
            .await
            .is_err()
    );

    // stop() is idempotent
    session.stop().await;
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_session_liveness_timeout_reconnects_and_resubscribes() {
    let (uri, connections) = spawn_server(ServerScript::Silence).await;

    let callback: StreamCallback = Arc::new(|_| Box::pin(async {}));
    let options = SessionOptions {
        no_message_timeout: Duration::from_millis(300),
        reconnect_delay: Duration::from_millis(100),
        ..SessionOptions::default()
    };

    let session = loopback_session(uri, options, callback);
    session.start().unwrap();

    // The silent server trips the liveness watchdog; each epoch re-dials and re-subscribes
    // (the server asserts the subscription frame on every connection)
    tokio::time::timeout(Duration::from_secs(10), async {
        while connections.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("session did not reconnect after liveness timeout");

    session.stop().await;
}

#[tokio::test]
async fn test_session_queue_overflow_escalates_to_stop() {
    // 10 frames arrive immediately; a slow single worker against a bound of 4 must observe
    // saturation and stop the session rather than silently dropping
    let (uri, _connections) = spawn_server(ServerScript::SendFrames(10)).await;

    let callback: StreamCallback = Arc::new(|_| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(300)).await;
        })
    });
    let options = SessionOptions {
        worker_count: 1,
        queue_bound: 4,
        reconnect_delay: Duration::from_secs(30),
        no_message_timeout: Duration::from_secs(60),
        ..SessionOptions::default()
    };

    let session = loopback_session(uri, options, callback);
    session.start().unwrap();

    tokio::time::timeout(Duration::from_secs(10), async {
        while session.state() != SessionState::Stopping {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("queue saturation did not stop the session");

    let fault = session.last_fault();
    assert!(
        matches!(fault, Some(DataError::QueueOverflow { bound: 4, .. })),
        "expected QueueOverflow, got {fault:?}"
    );

    // And shutdown still completes cleanly
    session.stop().await;
    assert_eq!(session.state(), SessionState::Idle);
}
