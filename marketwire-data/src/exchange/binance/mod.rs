use crate::{
    error::DataError,
    exchange::{SocketManager, interval_token, require_tickers},
    session::{VenueBinding, WsSession},
    subscription::{SessionOptions, StreamCallback, SubscriptionSpec},
};
use itertools::Itertools;
use marketwire_instrument::{MarketType, Timeframe, Venue};
use marketwire_integration::protocol::websocket::WsMessage;
use smol_str::SmolStr;
use url::Url;

/// Normalisation of raw Binance payloads into the unified record family.
pub mod adapter;

/// Binance spot & USDT-margined futures snapshot client.
pub mod client;

pub use client::BinanceClient;

/// [`BinanceSpot`](MarketType::Spot) server base url.
///
/// See docs: <https://binance-docs.github.io/apidocs/spot/en/#websocket-market-streams>
pub const WS_BASE_URL_BINANCE_SPOT: &str = "wss://stream.binance.com:9443";

/// [`BinanceFuturesUsd`](MarketType::Futures) server base url.
///
/// See docs: <https://binance-docs.github.io/apidocs/futures/en/#websocket-market-streams>
pub const WS_BASE_URL_BINANCE_FUTURES: &str = "wss://fstream.binance.com";

/// Whole-market liquidation topic, only served by the futures server.
const TOPIC_LIQUIDATIONS: &str = "!forceOrder@arr";

/// Canonical timeframe to Binance interval token. Binance supports the full canonical set and
/// its tokens are the canonical strings themselves.
pub const INTERVALS: &[(Timeframe, &str)] = &[
    (Timeframe::M1, "1m"),
    (Timeframe::M3, "3m"),
    (Timeframe::M5, "5m"),
    (Timeframe::M15, "15m"),
    (Timeframe::M30, "30m"),
    (Timeframe::H1, "1h"),
    (Timeframe::H2, "2h"),
    (Timeframe::H4, "4h"),
    (Timeframe::H6, "6h"),
    (Timeframe::H8, "8h"),
    (Timeframe::H12, "12h"),
    (Timeframe::D1, "1d"),
    (Timeframe::D3, "3d"),
    (Timeframe::W1, "1w"),
    (Timeframe::Mo1, "1M"),
];

/// [`Binance`] venue - carries its subscriptions in the connection URI, relies on
/// transport-level PING/PONG, and needs no subscribe payload.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Binance;

impl VenueBinding for Binance {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        let base = if spec.market == MarketType::Futures || spec.topic == TOPIC_LIQUIDATIONS {
            WS_BASE_URL_BINANCE_FUTURES
        } else {
            WS_BASE_URL_BINANCE_SPOT
        };

        // Markets must be lowercase when subscribing, even though Binance reports them
        // uppercase in the payloads
        let uri = match spec.tickers() {
            [] => format!("{base}/ws/{}", spec.topic),
            [ticker] => format!("{base}/ws/{}{}", ticker.to_lowercase(), spec.topic),
            tickers => {
                let streams = tickers
                    .iter()
                    .map(|ticker| format!("{}{}", ticker.to_lowercase(), spec.topic))
                    .join("/");
                format!("{base}/stream?streams={streams}")
            }
        };

        Url::parse(&uri).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, _spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        Ok(vec![])
    }
}

impl SocketManager for Binance {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn klines_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        timeframe: Timeframe,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let token = interval_token(Venue::Binance, INTERVALS, timeframe)?;
        let spec = SubscriptionSpec::new(
            Venue::Binance,
            market,
            format!("@kline_{token}"),
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Binance, callback))
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Binance,
            market,
            "@aggTrade",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Binance, callback))
    }

    fn tickers_socket(
        &self,
        market: MarketType,
        _tickers: Option<&[SmolStr]>,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        // Whole-market stream; no per-symbol scoping
        let spec =
            SubscriptionSpec::new(Venue::Binance, market, "!ticker@arr", None).with_options(options);
        Ok(WsSession::new(spec, &Binance, callback))
    }

    fn liquidations_socket(
        &self,
        _tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Binance,
            MarketType::Futures,
            TOPIC_LIQUIDATIONS,
            None,
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Binance, callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(market: MarketType, topic: &str, tickers: Option<Vec<SmolStr>>) -> SubscriptionSpec {
        SubscriptionSpec::new(Venue::Binance, market, topic, tickers)
    }

    #[test]
    fn test_binance_connection_uri() {
        struct TestCase {
            input: SubscriptionSpec,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: whole-market stream with no tickers
                input: spec(MarketType::Spot, "!ticker@arr", None),
                expected: "wss://stream.binance.com:9443/ws/!ticker@arr",
            },
            TestCase {
                // TC1: single ticker lowercased into the single-stream uri
                input: spec(
                    MarketType::Spot,
                    "@aggTrade",
                    Some(vec![SmolStr::new("BTCUSDT")]),
                ),
                expected: "wss://stream.binance.com:9443/ws/btcusdt@aggTrade",
            },
            TestCase {
                // TC2: multiple tickers use the combined-stream uri
                input: spec(
                    MarketType::Futures,
                    "@aggTrade",
                    Some(vec![SmolStr::new("BTCUSDT"), SmolStr::new("ETHUSDT")]),
                ),
                expected:
                    "wss://fstream.binance.com/stream?streams=btcusdt@aggTrade/ethusdt@aggTrade",
            },
            TestCase {
                // TC3: liquidations are futures-server even without an explicit market
                input: spec(MarketType::Futures, "!forceOrder@arr", None),
                expected: "wss://fstream.binance.com/ws/!forceOrder@arr",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = Binance.connection_uri(&test.input).unwrap();
            assert_eq!(actual.as_str(), test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_binance_klines_socket_rejects_nothing() {
        // Binance supports the entire canonical timeframe set
        for timeframe in Timeframe::ALL {
            assert!(interval_token(Venue::Binance, INTERVALS, timeframe).is_ok());
        }
    }
}
