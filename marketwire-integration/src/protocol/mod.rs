/// Contains useful `WebSocket` type aliases, a connection helper, and shared frame processing
/// utilities.
pub mod websocket;

/// Contains a retrying HTTP client executing plain JSON requests.
pub mod http;
