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

//! # Marketwire-Instrument
//! Core venue, market and timeframe data structures shared by every Marketwire integration.
//!
//! The [`Venue`] set is closed - extending it is a build-time change that must be accompanied by
//! the matching registry entries in `marketwire-data`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Canonical candle interval [`Timeframe`] and its venue translation utilities.
pub mod timeframe;
pub use timeframe::Timeframe;

/// Unique identifier for a supported market-data venue.
///
/// ### Notes
/// Venues with distinct spot and perpetual servers are still represented by a single variant;
/// the [`MarketType`] selects the server at connection time.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[serde(rename = "venue", rename_all = "snake_case")]
pub enum Venue {
    Binance,
    Bybit,
    Okx,
    Bitget,
    Mexc,
    Gate,
    Xt,
    Bitunix,
    Kcex,
    Bingx,
    Hyperliquid,
    Coinmarketcap,
    Coinalyze,
    Deribit,
}

impl Venue {
    /// Return the &str representation of this [`Venue`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Bybit => "bybit",
            Venue::Okx => "okx",
            Venue::Bitget => "bitget",
            Venue::Mexc => "mexc",
            Venue::Gate => "gate",
            Venue::Xt => "xt",
            Venue::Bitunix => "bitunix",
            Venue::Kcex => "kcex",
            Venue::Bingx => "bingx",
            Venue::Hyperliquid => "hyperliquid",
            Venue::Coinmarketcap => "coinmarketcap",
            Venue::Coinalyze => "coinalyze",
            Venue::Deribit => "deribit",
        }
    }

    /// Venues that expose exchange market-data feeds (ie/ everything except the auxiliary
    /// aggregator services).
    pub fn exchanges() -> &'static [Venue] {
        &[
            Venue::Binance,
            Venue::Bybit,
            Venue::Okx,
            Venue::Bitget,
            Venue::Mexc,
            Venue::Gate,
            Venue::Xt,
            Venue::Bitunix,
            Venue::Kcex,
            Venue::Bingx,
            Venue::Hyperliquid,
        ]
    }
}

impl Display for Venue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spot or USDT-margined perpetual futures market.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[serde(rename = "market_type", rename_all = "snake_case")]
pub enum MarketType {
    Spot,
    Futures,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Spot => "spot",
            MarketType::Futures => "futures",
        }
    }
}

impl Display for MarketType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// [`Side`] of a trade or liquidation - Buy or Sell.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY", alias = "b")]
    Buy,
    #[serde(alias = "sell", alias = "SELL", alias = "s")]
    Sell,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Side::Buy => "buy",
                Side::Sell => "sell",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_de_venue() {
        assert_eq!(
            serde_json::from_str::<Venue>(r#""binance""#).unwrap(),
            Venue::Binance
        );
        assert_eq!(
            serde_json::from_str::<Venue>(r#""hyperliquid""#).unwrap(),
            Venue::Hyperliquid
        );
        assert!(serde_json::from_str::<Venue>(r#""nasdaq""#).is_err());
    }

    #[test]
    fn test_de_side_aliases() {
        assert_eq!(serde_json::from_str::<Side>(r#""BUY""#).unwrap(), Side::Buy);
        assert_eq!(
            serde_json::from_str::<Side>(r#""sell""#).unwrap(),
            Side::Sell
        );
    }
}
