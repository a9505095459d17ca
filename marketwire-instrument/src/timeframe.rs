use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Canonical candle interval.
///
/// Every venue declares the subset it supports together with the wire token for each supported
/// interval (eg/ `H1` is `"60"` on Bybit, `"Min60"` on MEXC, `"1H"` on OKX). Translation tables
/// live with the venue socket managers in `marketwire-data`; requesting an interval a venue does
/// not support fails there with a typed error.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
    Mo1,
}

impl Timeframe {
    /// All canonical intervals, shortest first.
    pub const ALL: [Timeframe; 15] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H8,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::D3,
        Timeframe::W1,
        Timeframe::Mo1,
    ];

    /// Return the canonical &str representation of this [`Timeframe`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H8 => "8h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::D3 => "3d",
            Timeframe::W1 => "1w",
            Timeframe::Mo1 => "1M",
        }
    }

    /// Interval duration in seconds. Months use the 30-day convention.
    pub fn as_secs(&self) -> u64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M3 => 180,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::M30 => 1800,
            Timeframe::H1 => 3600,
            Timeframe::H2 => 7200,
            Timeframe::H4 => 14400,
            Timeframe::H6 => 21600,
            Timeframe::H8 => 28800,
            Timeframe::H12 => 43200,
            Timeframe::D1 => 86400,
            Timeframe::D3 => 259200,
            Timeframe::W1 => 604800,
            Timeframe::Mo1 => 2592000,
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|timeframe| timeframe.as_str() == s)
            .ok_or_else(|| ParseTimeframeError(s.to_string()))
    }
}

impl TryFrom<&str> for Timeframe {
    type Error = ParseTimeframeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Timeframe::from_str(value)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = ParseTimeframeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Timeframe::from_str(&value)
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.as_str().to_string()
    }
}

/// Input did not match any canonical [`Timeframe`] token.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("unrecognised Timeframe: {0}")]
pub struct ParseTimeframeError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_str_round_trip() {
        for timeframe in Timeframe::ALL {
            assert_eq!(
                Timeframe::from_str(timeframe.as_str()).unwrap(),
                timeframe,
                "{timeframe} failed round trip"
            );
        }
    }

    #[test]
    fn test_timeframe_serde() {
        assert_eq!(
            serde_json::from_str::<Timeframe>(r#""1h""#).unwrap(),
            Timeframe::H1
        );
        assert_eq!(
            serde_json::from_str::<Timeframe>(r#""1M""#).unwrap(),
            Timeframe::Mo1
        );
        assert!(serde_json::from_str::<Timeframe>(r#""7h""#).is_err());
        assert_eq!(
            serde_json::to_string(&Timeframe::D1).unwrap(),
            r#""1d""#.to_string()
        );
    }
}
