use crate::{
    error::DataError,
    session::WsSession,
    subscription::{SessionOptions, StreamCallback},
};
use async_trait::async_trait;
use marketwire_instrument::{MarketType, Timeframe, Venue};
use serde_json::Value;
use smol_str::SmolStr;

/// `Binance` venue binding, snapshot client, adapters and socket manager.
pub mod binance;

/// `Bybit` venue binding, snapshot client, adapters and socket manager.
pub mod bybit;

/// `Okx` venue binding, snapshot client, adapters and socket manager.
pub mod okx;

/// `Bitget` venue binding, snapshot client, adapters and socket manager.
pub mod bitget;

/// `Mexc` venue binding, snapshot client, adapters and socket manager, including the spot
/// Protocol-Buffer push framing.
pub mod mexc;

/// `Gate` venue binding, snapshot client, adapters and socket manager.
pub mod gate;

/// `Xt` venue binding, snapshot client, adapters and socket manager.
pub mod xt;

/// `Bitunix` venue binding, snapshot client, adapters and socket manager.
pub mod bitunix;

/// `Kcex` venue binding, snapshot client, adapters and socket manager.
pub mod kcex;

/// `Bingx` venue binding, snapshot client, adapters and socket manager, including the gzip
/// frame layer.
pub mod bingx;

/// `Hyperliquid` venue binding, snapshot client, adapters and socket manager.
pub mod hyperliquid;

/// Venue snapshot client over REST - 24h tickers, funding rate, open interest, klines, depth.
///
/// Operations a venue has no public endpoint for return [`DataError::NotImplemented`].
#[async_trait]
pub trait MarketClient: Send + Sync {
    fn venue(&self) -> Venue;

    /// Spot 24-hour ticker statistics, optionally scoped to one symbol.
    async fn ticker(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "ticker",
        })
    }

    /// Perpetual futures 24-hour ticker statistics, optionally scoped to one symbol.
    async fn futures_ticker(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "futures_ticker",
        })
    }

    /// Current funding rate data.
    async fn funding_rate(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "funding_rate",
        })
    }

    /// Open interest snapshot.
    async fn open_interest(&self, _symbol: Option<&str>) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "open_interest",
        })
    }

    /// Spot OHLCV bars.
    async fn klines(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _limit: Option<u32>,
    ) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "klines",
        })
    }

    /// Perpetual futures OHLCV bars.
    async fn futures_klines(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _limit: Option<u32>,
    ) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "futures_klines",
        })
    }

    /// Order-book snapshot.
    async fn depth(&self, _symbol: &str, _limit: Option<u32>) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "depth",
        })
    }

    /// Last traded price across perpetual symbols.
    async fn futures_last_price(&self) -> Result<Value, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "futures_last_price",
        })
    }
}

/// Per-venue factory of topic-scoped streaming sessions.
///
/// Managers translate canonical [`Timeframe`] values into venue wire tokens via the venue's
/// fixed lookup table and reject unsupported market/timeframe/topic combinations with typed
/// errors at construction time.
pub trait SocketManager: Send + Sync {
    fn venue(&self) -> Venue;

    /// Construct the kline session. Fails with [`DataError::TimeframeUnsupported`] if the venue
    /// does not support the requested canonical timeframe.
    fn klines_socket(
        &self,
        _market: MarketType,
        _tickers: &[SmolStr],
        _timeframe: Timeframe,
        _callback: StreamCallback,
        _options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "klines_socket",
        })
    }

    /// Construct the aggregated-trades session.
    fn aggtrades_socket(
        &self,
        _market: MarketType,
        _tickers: &[SmolStr],
        _callback: StreamCallback,
        _options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "aggtrades_socket",
        })
    }

    /// Construct the tickers session. Venues with a whole-market feed ignore `tickers`.
    fn tickers_socket(
        &self,
        _market: MarketType,
        _tickers: Option<&[SmolStr]>,
        _callback: StreamCallback,
        _options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "tickers_socket",
        })
    }

    /// Construct the liquidations session. Fails with [`DataError::NotImplemented`] on venues
    /// that do not expose a liquidation feed.
    fn liquidations_socket(
        &self,
        _tickers: &[SmolStr],
        _callback: StreamCallback,
        _options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        Err(DataError::NotImplemented {
            venue: self.venue(),
            item: "liquidations_socket",
        })
    }
}

/// Translate a canonical [`Timeframe`] through a venue interval table.
pub fn interval_token(
    venue: Venue,
    table: &[(Timeframe, &'static str)],
    timeframe: Timeframe,
) -> Result<&'static str, DataError> {
    table
        .iter()
        .find(|(canonical, _)| *canonical == timeframe)
        .map(|(_, token)| *token)
        .ok_or(DataError::TimeframeUnsupported { venue, timeframe })
}

/// Reverse lookup of a venue interval token back to its canonical [`Timeframe`].
pub fn interval_from_token(
    table: &[(Timeframe, &'static str)],
    token: &str,
) -> Option<Timeframe> {
    table
        .iter()
        .find(|(_, wire)| *wire == token)
        .map(|(canonical, _)| *canonical)
}

/// Require a non-empty ticker set at session construction.
pub(crate) fn require_tickers(tickers: &[SmolStr]) -> Result<Vec<SmolStr>, DataError> {
    if tickers.is_empty() {
        return Err(DataError::TickersRequired);
    }
    Ok(tickers.to_vec())
}
