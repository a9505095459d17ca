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

/// Normalisation of raw Bitget payloads into the unified record family.
pub mod adapter;

/// Bitget spot & USDT-futures snapshot client.
pub mod client;

pub use client::BitgetClient;

/// [`Bitget`] v2 public server base url, shared by spot and futures.
///
/// See docs: <https://www.bitget.com/api-doc/common/websocket-intro>
pub const WS_BASE_URL_BITGET: &str = "wss://ws.bitget.com/v2/ws/public";

/// Canonical timeframe to Bitget candle token.
pub const INTERVALS: &[(Timeframe, &str)] = &[
    (Timeframe::M1, "1m"),
    (Timeframe::M5, "5m"),
    (Timeframe::M15, "15m"),
    (Timeframe::M30, "30m"),
    (Timeframe::H1, "1H"),
    (Timeframe::H4, "4H"),
    (Timeframe::H6, "6H"),
    (Timeframe::H12, "12H"),
    (Timeframe::D1, "1D"),
    (Timeframe::D3, "3D"),
    (Timeframe::W1, "1W"),
    (Timeframe::Mo1, "1M"),
];

/// [`Bitget`] venue - instType/channel/instId subscription args in one JSON frame, literal
/// `"ping"` heartbeat.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Bitget;

impl Bitget {
    fn inst_type(market: MarketType) -> &'static str {
        match market {
            MarketType::Spot => "SPOT",
            MarketType::Futures => "USDT-FUTURES",
        }
    }
}

impl VenueBinding for Bitget {
    fn venue(&self) -> Venue {
        Venue::Bitget
    }

    fn connection_uri(&self, _spec: &SubscriptionSpec) -> Result<Url, DataError> {
        Url::parse(WS_BASE_URL_BITGET).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        let args = spec
            .tickers()
            .iter()
            .map(|ticker| {
                json!({
                    "instType": Self::inst_type(spec.market),
                    "channel": spec.topic,
                    "instId": ticker.to_uppercase(),
                })
            })
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
        Some(WsMessage::text("ping"))
    }
}

impl SocketManager for Bitget {
    fn venue(&self) -> Venue {
        Venue::Bitget
    }

    fn klines_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        timeframe: Timeframe,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let token = interval_token(Venue::Bitget, INTERVALS, timeframe)?;
        let spec = SubscriptionSpec::new(
            Venue::Bitget,
            market,
            format!("candle{token}"),
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Bitget, callback))
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Bitget,
            market,
            "trade",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Bitget, callback))
    }

    fn tickers_socket(
        &self,
        market: MarketType,
        tickers: Option<&[SmolStr]>,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let tickers = require_tickers(tickers.unwrap_or_default())?;
        let spec = SubscriptionSpec::new(Venue::Bitget, market, "ticker", Some(tickers))
            .with_options(options);
        Ok(WsSession::new(spec, &Bitget, callback))
    }

    // Bitget exposes no liquidation feed - the default NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitget_subscribe_payload_inst_type() {
        let spec = SubscriptionSpec::new(
            Venue::Bitget,
            MarketType::Futures,
            "trade",
            Some(vec![SmolStr::new("btcusdt")]),
        );

        let payloads = Bitget.subscribe_payloads(&spec).unwrap();
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"args":[{"channel":"trade","instId":"BTCUSDT","instType":"USDT-FUTURES"}],"op":"subscribe"}"#
        );
    }

    #[test]
    fn test_bitget_interval_round_trip() {
        use crate::exchange::interval_from_token;

        for (timeframe, token) in INTERVALS {
            assert_eq!(
                interval_from_token(INTERVALS, token),
                Some(*timeframe),
                "{timeframe} failed round trip"
            );
        }

        assert!(interval_token(Venue::Bitget, INTERVALS, Timeframe::H8).is_err());
        assert!(interval_token(Venue::Bitget, INTERVALS, Timeframe::M3).is_err());
    }

    #[test]
    fn test_bitget_liquidations_unimplemented() {
        let callback: crate::subscription::StreamCallback =
            std::sync::Arc::new(|_| Box::pin(async {}));
        let actual = Bitget.liquidations_socket(
            &[SmolStr::new("BTCUSDT")],
            callback,
            SessionOptions::default(),
        );
        assert!(matches!(
            actual,
            Err(DataError::NotImplemented { venue: Venue::Bitget, .. })
        ));
    }
}
