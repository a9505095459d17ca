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

/// Normalisation of raw OKX payloads into the unified record family.
pub mod adapter;

/// OKX snapshot client.
pub mod client;

pub use client::OkxClient;

/// [`Okx`] public-channel server base url.
///
/// See docs: <https://www.okx.com/docs-v5/en/#overview-websocket>
pub const WS_BASE_URL_OKX_PUBLIC: &str = "wss://ws.okx.com:8443/ws/v5/public";

/// [`Okx`] business-channel server base url - candle and trades-all topics live here.
pub const WS_BASE_URL_OKX_BUSINESS: &str = "wss://ws.okx.com:8443/ws/v5/business";

/// Topic prefixes OKX serves from the business endpoint.
const BUSINESS_TOPICS: &[&str] = &["trades-all", "candle"];

/// Whole-SWAP liquidation channel; subscribed by instrument type rather than instrument id.
const TOPIC_LIQUIDATIONS: &str = "liquidation-orders";

/// Canonical timeframe to OKX bar token.
///
/// See docs: <https://www.okx.com/docs-v5/en/#order-book-trading-market-data-get-candlesticks>
pub const INTERVALS: &[(Timeframe, &str)] = &[
    (Timeframe::M1, "1m"),
    (Timeframe::M3, "3m"),
    (Timeframe::M5, "5m"),
    (Timeframe::M15, "15m"),
    (Timeframe::M30, "30m"),
    (Timeframe::H1, "1H"),
    (Timeframe::H2, "2H"),
    (Timeframe::H4, "4H"),
    (Timeframe::H6, "6H"),
    (Timeframe::H12, "12H"),
    (Timeframe::D1, "1D"),
    (Timeframe::D3, "3D"),
    (Timeframe::W1, "1W"),
    (Timeframe::Mo1, "1M"),
];

/// [`Okx`] venue - channel/instId subscription args in one JSON frame, transport-level
/// PING/PONG.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Okx;

impl VenueBinding for Okx {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        let base = if BUSINESS_TOPICS
            .iter()
            .any(|topic| spec.topic.starts_with(topic))
        {
            WS_BASE_URL_OKX_BUSINESS
        } else {
            WS_BASE_URL_OKX_PUBLIC
        };
        Url::parse(base).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        let tickers = spec.tickers();
        if tickers.is_empty() {
            return Err(DataError::TickersRequired);
        }

        let args = if spec.topic == TOPIC_LIQUIDATIONS {
            vec![json!({
                "channel": spec.topic,
                "instType": tickers[0],
            })]
        } else {
            tickers
                .iter()
                .map(|ticker| {
                    json!({
                        "channel": spec.topic,
                        "instId": ticker.to_uppercase(),
                    })
                })
                .collect()
        };

        Ok(vec![WsMessage::text(
            json!({
                "op": "subscribe",
                "args": args,
            })
            .to_string(),
        )])
    }
}

impl SocketManager for Okx {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    fn klines_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        timeframe: Timeframe,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let token = interval_token(Venue::Okx, INTERVALS, timeframe)?;
        let spec = SubscriptionSpec::new(
            Venue::Okx,
            market,
            format!("candle{token}"),
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Okx, callback))
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let spec = SubscriptionSpec::new(
            Venue::Okx,
            market,
            "trades-all",
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Okx, callback))
    }

    fn tickers_socket(
        &self,
        market: MarketType,
        tickers: Option<&[SmolStr]>,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let tickers = require_tickers(tickers.unwrap_or_default())?;
        let spec = SubscriptionSpec::new(Venue::Okx, market, "tickers", Some(tickers))
            .with_options(options);
        Ok(WsSession::new(spec, &Okx, callback))
    }

    fn liquidations_socket(
        &self,
        _tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        // OKX subscribes liquidations for the whole SWAP instrument type
        let spec = SubscriptionSpec::new(
            Venue::Okx,
            MarketType::Futures,
            TOPIC_LIQUIDATIONS,
            Some(vec![SmolStr::new("SWAP")]),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Okx, callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_okx_connection_uri_selects_business_for_candles() {
        struct TestCase {
            topic: &'static str,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: candle topics are business
                topic: "candle1H",
                expected: WS_BASE_URL_OKX_BUSINESS,
            },
            TestCase {
                // TC1: trades-all is business
                topic: "trades-all",
                expected: WS_BASE_URL_OKX_BUSINESS,
            },
            TestCase {
                // TC2: tickers are public
                topic: "tickers",
                expected: WS_BASE_URL_OKX_PUBLIC,
            },
            TestCase {
                // TC3: liquidation-orders is public
                topic: "liquidation-orders",
                expected: WS_BASE_URL_OKX_PUBLIC,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let spec = SubscriptionSpec::new(
                Venue::Okx,
                MarketType::Futures,
                test.topic,
                Some(vec![SmolStr::new("BTC-USDT-SWAP")]),
            );
            let actual = Okx.connection_uri(&spec).unwrap();
            assert_eq!(actual.as_str(), test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_okx_interval_round_trip() {
        use crate::exchange::interval_from_token;

        for (timeframe, token) in INTERVALS {
            assert_eq!(
                interval_from_token(INTERVALS, token),
                Some(*timeframe),
                "{timeframe} failed round trip"
            );
        }

        // 8h bars are not served by OKX
        assert!(interval_token(Venue::Okx, INTERVALS, Timeframe::H8).is_err());
    }

    #[test]
    fn test_okx_subscribe_requires_tickers() {
        let spec = SubscriptionSpec::new(Venue::Okx, MarketType::Spot, "tickers", None);
        assert!(matches!(
            Okx.subscribe_payloads(&spec),
            Err(DataError::TickersRequired)
        ));
    }

    #[test]
    fn test_okx_liquidation_subscribe_uses_inst_type() {
        let spec = SubscriptionSpec::new(
            Venue::Okx,
            MarketType::Futures,
            "liquidation-orders",
            Some(vec![SmolStr::new("SWAP")]),
        );
        let payloads = Okx.subscribe_payloads(&spec).unwrap();
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"args":[{"channel":"liquidation-orders","instType":"SWAP"}],"op":"subscribe"}"#
        );
    }
}
