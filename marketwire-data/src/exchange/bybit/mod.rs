use crate::{
    error::DataError,
    exchange::{SocketManager, interval_token, require_tickers},
    session::{VenueBinding, WsSession},
    subscription::{SessionOptions, StreamCallback, SubscriptionSpec},
};
use marketwire_instrument::{MarketType, Timeframe, Venue};
use marketwire_integration::protocol::websocket::WsMessage;
use serde_json::json;
use smol_str::SmolStr;
use url::Url;

/// Normalisation of raw Bybit payloads into the unified record family.
pub mod adapter;

/// Bybit spot & linear futures snapshot client.
pub mod client;

pub use client::BybitClient;

/// [`Bybit`] spot server base url.
///
/// See docs: <https://bybit-exchange.github.io/docs/v5/ws/connect>
pub const WS_BASE_URL_BYBIT_SPOT: &str = "wss://stream.bybit.com/v5/public/spot";

/// [`Bybit`] linear futures server base url.
pub const WS_BASE_URL_BYBIT_LINEAR: &str = "wss://stream.bybit.com/v5/public/linear";

/// Canonical timeframe to Bybit interval token.
///
/// See docs: <https://bybit-exchange.github.io/docs/v5/enum#interval>
pub const INTERVALS: &[(Timeframe, &str)] = &[
    (Timeframe::M1, "1"),
    (Timeframe::M3, "3"),
    (Timeframe::M5, "5"),
    (Timeframe::M15, "15"),
    (Timeframe::M30, "30"),
    (Timeframe::H1, "60"),
    (Timeframe::H2, "120"),
    (Timeframe::H4, "240"),
    (Timeframe::H6, "360"),
    (Timeframe::H12, "720"),
    (Timeframe::D1, "D"),
    (Timeframe::W1, "W"),
    (Timeframe::Mo1, "M"),
];

/// [`Bybit`] venue - topic.symbol subscription args in one JSON frame, custom `{"op":"ping"}`
/// heartbeat.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Bybit;

impl VenueBinding for Bybit {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        let base = match spec.market {
            MarketType::Spot => WS_BASE_URL_BYBIT_SPOT,
            MarketType::Futures => WS_BASE_URL_BYBIT_LINEAR,
        };
        Url::parse(base).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        let args = spec
            .tickers()
            .iter()
            .map(|ticker| format!("{}.{ticker}", spec.topic))
            .collect::<Vec<_>>();

        Ok(vec![WsMessage::text(
            json!({
                "op": "subscribe",
                "args": args,
            })
            .to_string(),
        )])
    }

    fn ping_payload(&self, _spec: &SubscriptionSpec) -> Option<WsMessage> {
        Some(WsMessage::text(json!({"op": "ping"}).to_string()))
    }
}

impl SocketManager for Bybit {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    fn klines_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        timeframe: Timeframe,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let token = interval_token(Venue::Bybit, INTERVALS, timeframe)?;
        let spec = SubscriptionSpec::new(
            Venue::Bybit,
            market,
            format!("kline.{token}"),
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Bybit, callback))
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Bybit,
            market,
            "publicTrade",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Bybit, callback))
    }

    fn tickers_socket(
        &self,
        market: MarketType,
        tickers: Option<&[SmolStr]>,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let tickers = require_tickers(tickers.unwrap_or_default())?;
        let spec = SubscriptionSpec::new(Venue::Bybit, market, "tickers", Some(tickers))
            .with_options(options);
        Ok(WsSession::new(spec, &Bybit, callback))
    }

    fn liquidations_socket(
        &self,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Bybit,
            MarketType::Futures,
            "liquidation",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Bybit, callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bybit_subscribe_payload() {
        let spec = SubscriptionSpec::new(
            Venue::Bybit,
            MarketType::Futures,
            "publicTrade",
            Some(vec![SmolStr::new("BTCUSDT"), SmolStr::new("ETHUSDT")]),
        );

        let payloads = Bybit.subscribe_payloads(&spec).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"args":["publicTrade.BTCUSDT","publicTrade.ETHUSDT"],"op":"subscribe"}"#
        );
    }

    #[test]
    fn test_bybit_interval_round_trip() {
        use crate::exchange::interval_from_token;

        for (timeframe, token) in INTERVALS {
            assert_eq!(
                interval_from_token(INTERVALS, token),
                Some(*timeframe),
                "{timeframe} failed round trip"
            );
        }

        // 8h and 3d are not served by Bybit
        assert!(interval_token(Venue::Bybit, INTERVALS, Timeframe::H8).is_err());
        assert!(interval_token(Venue::Bybit, INTERVALS, Timeframe::D3).is_err());
    }
}
