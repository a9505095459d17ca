#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity)]

//! # Marketwire-Integration
//! Low-level transport machinery for composing venue integrations:
//! * **WebSocket** - tungstenite type aliases, connection helper and frame processing utilities
//!   shared by every streaming session.
//! * **REST** - a retrying [`RestClient`](protocol::http::RestClient) executing plain JSON
//!   requests with a bounded-attempt, fixed-delay policy.
//! * **SerDe** - deserialisation helpers for the string-encoded numerics the venues ship.

/// All transport IO related errors generated in `marketwire-integration`.
pub mod error;

/// WebSocket and HTTP protocol implementations.
pub mod protocol;

/// Deserialisation helpers for venue wire formats.
pub mod de;

pub use error::SocketError;
