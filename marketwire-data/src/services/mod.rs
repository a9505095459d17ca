//! Auxiliary service clients - market-data aggregators and venues consumed outside the
//! exchange registry.

/// Coinmarketcap client and rating adapter.
pub mod coinmarketcap;

/// Coinalyze aggregated open-interest and liquidation history client.
pub mod coinalyze;

/// Deribit JSON-RPC client with OAuth client-credentials authentication.
pub mod deribit;
