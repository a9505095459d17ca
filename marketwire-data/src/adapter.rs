use crate::{
    error::AdaptError,
    records::{AggTrade, Depth, Kline, Liquidation, OpenInterest, TickerDaily},
};
use fnv::FnvHashMap;
use marketwire_instrument::Venue;
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

/// Deserialize a raw venue payload into its wire shape, mapping schema mismatches to
/// [`AdaptError`] with the serde reason.
pub(crate) fn from_raw<'de, T: Deserialize<'de>>(
    venue: Venue,
    raw: &'de Value,
) -> Result<T, AdaptError> {
    T::deserialize(raw).map_err(|error| AdaptError::new(venue, error.to_string()))
}

/// Map from venue symbol to a normalised record.
pub type SymbolMap<T> = FnvHashMap<SmolStr, T>;

/// Venue adapter - pure, stateless transforms from raw venue payloads into the normalised
/// record family. One implementation exists per venue, registered in
/// [`registry`](crate::registry).
///
/// Every operation takes the raw JSON exactly as the venue shipped it (HTTP response body or
/// decoded WebSocket frame). Operations the venue has no feed or endpoint for return
/// [`AdaptError::unsupported`]; schema mismatches surface as [`AdaptError`] and are expected
/// to be logged and dropped by the caller, never to crash a stream.
///
/// `only_usdt` filters symbols by the venue's documented USDT suffix (`USDT`, `-USDT`,
/// `-USDT-SWAP`, `_USDT`, ...). Symbols are returned in the venue's native form; any
/// departure from that is documented on the implementation.
pub trait VenueAdapter: Send + Sync {
    fn venue(&self) -> Venue;

    /// Spot symbols listed by the venue.
    fn tickers(&self, _raw: &Value, _only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "tickers"))
    }

    /// Perpetual futures symbols listed by the venue.
    fn futures_tickers(&self, _raw: &Value, _only_usdt: bool) -> Result<Vec<SmolStr>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "futures_tickers"))
    }

    /// 24-hour statistics per spot symbol.
    fn ticker_24h(
        &self,
        _raw: &Value,
        _only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "ticker_24h"))
    }

    /// 24-hour statistics per perpetual symbol.
    fn futures_ticker_24h(
        &self,
        _raw: &Value,
        _only_usdt: bool,
    ) -> Result<SymbolMap<TickerDaily>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "futures_ticker_24h"))
    }

    /// Funding rate per perpetual symbol, in percent (wire fraction x 100).
    ///
    /// Venues whose funding endpoint answers per ticker (OKX, Bitget) accept both a single
    /// response object and a JSON array of per-ticker responses here.
    fn funding_rate(&self, _raw: &Value, _only_usdt: bool) -> Result<SymbolMap<f64>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "funding_rate"))
    }

    /// Open interest per perpetual symbol, in base-asset units.
    ///
    /// On contract-denominated venues the contract-size fix must run on the raw payload before
    /// this adapter.
    fn open_interest(&self, _raw: &Value) -> Result<SymbolMap<OpenInterest>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "open_interest"))
    }

    /// OHLCV bars from the spot klines endpoint.
    fn kline(&self, _raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "kline"))
    }

    /// OHLCV bars from the futures klines endpoint.
    fn futures_kline(&self, _raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "futures_kline"))
    }

    /// OHLCV bars from one streaming kline message.
    fn kline_message(&self, _raw: &Value) -> Result<Vec<Kline>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "kline_message"))
    }

    /// Aggregated trades from one streaming trade message.
    fn aggtrades_message(&self, _raw: &Value) -> Result<Vec<AggTrade>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "aggtrades_message"))
    }

    /// Forced liquidations from one streaming liquidation message.
    fn liquidation_message(&self, _raw: &Value) -> Result<Vec<Liquidation>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "liquidation_message"))
    }

    /// Order-book snapshot, canonically sorted.
    fn depth(&self, _raw: &Value) -> Result<Depth, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "depth"))
    }

    /// Last traded price per perpetual symbol.
    fn futures_last_price(&self, _raw: &Value) -> Result<SymbolMap<f64>, AdaptError> {
        Err(AdaptError::unsupported(self.venue(), "futures_last_price"))
    }
}
