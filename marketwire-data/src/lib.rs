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
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Marketwire-Data
//! A unified, vendor-neutral market-data access layer for leading cryptocurrency venues -
//! batteries included. It is:
//! * **Normalised**: every venue's tickers, 24h statistics, funding rates, open interest,
//!   candles, trades, liquidations and order books come back in one record family.
//! * **Resilient**: streaming sessions reconnect without bound, watch connection liveness and
//!   apply backpressure through a bounded inbound queue consumed by a worker pool.
//! * **Composable**: the [`registry`] binds each [`Venue`](marketwire_instrument::Venue) to its
//!   snapshot client, socket manager and adapter; callers resolve the triple and compose a
//!   pipeline.
//!
//! ## User API
//! - Resolve a venue triple via [`registry`].
//! - Construct snapshot clients with a shared
//!   [`RestClient`](marketwire_integration::protocol::http::RestClient) pool.
//! - Construct streaming sessions via the venue [`SocketManager`](exchange::SocketManager),
//!   passing an async callback; `start()` the session and later `stop()` it.
//! - The callback receives raw frames; invoke the venue [`VenueAdapter`](adapter::VenueAdapter)
//!   on demand. Venues that denominate size in contracts need [`fixes`] initialised first.

/// All [`Error`](std::error::Error)s generated in `marketwire-data`.
pub mod error;

/// The normalised record family every adapter produces.
pub mod records;

/// Immutable streaming-session parameters and the caller callback type.
pub mod subscription;

/// The resilient topic-scoped streaming session and the venue protocol binding trait.
pub mod session;

/// The venue adapter trait.
pub mod adapter;

/// Venue integrations - binding, snapshot client, adapter and socket manager per venue.
pub mod exchange;

/// Contract-size correction for venues that report sizes in contracts rather than base units.
pub mod fixes;

/// Venue identifier -> (client, socket manager, adapter) lookup tables.
pub mod registry;

/// Auxiliary service clients - Coinmarketcap, Coinalyze, Deribit.
pub mod services;

pub use error::{AdaptError, DataError};

#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tracing_subscriber as _;
