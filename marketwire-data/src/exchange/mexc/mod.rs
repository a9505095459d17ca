use crate::{
    error::DataError,
    exchange::{SocketManager, interval_token, require_tickers},
    session::{FrameOutcome, VenueBinding, WsSession},
    subscription::{SessionOptions, StreamCallback, SubscriptionSpec},
};
use marketwire_instrument::{MarketType, Timeframe, Venue};
use marketwire_integration::{
    error::SocketError,
    protocol::websocket::WsMessage,
};
use prost::Message;
use serde_json::json;
use smol_str::SmolStr;
use tracing::debug;
use url::Url;

/// Normalisation of raw MEXC payloads into the unified record family.
pub mod adapter;

/// MEXC spot & contract snapshot client.
pub mod client;

/// MEXC spot push-stream Protocol-Buffer frames.
pub mod proto;

pub use client::MexcClient;

/// [`Mexc`] spot server base url - Protocol-Buffer frames for several topics.
pub const WS_BASE_URL_MEXC_SPOT: &str = "wss://wbs-api.mexc.com/ws";

/// [`Mexc`] futures server base url.
pub const WS_BASE_URL_MEXC_FUTURES: &str = "wss://contract.mexc.com/edge";

const TOPIC_SPOT_KLINES: &str = "spot@public.kline.v3.api.pb";
const TOPIC_SPOT_AGGTRADES: &str = "spot@public.aggre.deals.v3.api.pb@100ms";
const TOPIC_SPOT_MINI_TICKERS: &str = "spot@public.miniTickers.v3.api.pb";

/// Canonical timeframe to MEXC interval token.
pub const INTERVALS: &[(Timeframe, &str)] = &[
    (Timeframe::M1, "Min1"),
    (Timeframe::M5, "Min5"),
    (Timeframe::M15, "Min15"),
    (Timeframe::M30, "Min30"),
    (Timeframe::H1, "Min60"),
    (Timeframe::H4, "Hour4"),
    (Timeframe::H8, "Hour8"),
    (Timeframe::D1, "Day1"),
    (Timeframe::W1, "Week1"),
    (Timeframe::Mo1, "Month1"),
];

/// Rewrite `BTCUSDT` into MEXC's futures `BTC_USDT` form, leaving already-underscored symbols
/// untouched.
pub(crate) fn futures_symbol(ticker: &str) -> String {
    if ticker.ends_with("_USDT") {
        ticker.to_string()
    } else {
        ticker.replace("USDT", "_USDT")
    }
}

/// [`Mexc`] venue - JSON subscriptions on both markets, but the spot server answers with
/// Protocol-Buffer binary frames that the binding decodes before enqueueing.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Mexc;

impl VenueBinding for Mexc {
    fn venue(&self) -> Venue {
        Venue::Mexc
    }

    fn connection_uri(&self, spec: &SubscriptionSpec) -> Result<Url, DataError> {
        let base = match spec.market {
            MarketType::Spot => WS_BASE_URL_MEXC_SPOT,
            MarketType::Futures => WS_BASE_URL_MEXC_FUTURES,
        };
        Url::parse(base).map_err(|error| DataError::Socket(error.to_string()))
    }

    fn subscribe_payloads(&self, spec: &SubscriptionSpec) -> Result<Vec<WsMessage>, DataError> {
        match spec.market {
            MarketType::Spot => {
                let params: Vec<String> = if spec.topic == TOPIC_SPOT_KLINES {
                    let Some(interval) = &spec.interval else {
                        return Err(DataError::TimeframeRequired { venue: Venue::Mexc });
                    };
                    spec.tickers()
                        .iter()
                        .map(|ticker| format!("{}@{ticker}@{interval}", spec.topic))
                        .collect()
                } else if spec.topic == TOPIC_SPOT_MINI_TICKERS {
                    let timezone = spec.interval.as_deref().unwrap_or("+8");
                    vec![format!("{}@UTC{timezone}", spec.topic)]
                } else {
                    spec.tickers()
                        .iter()
                        .map(|ticker| format!("{}@{ticker}", spec.topic))
                        .collect()
                };

                Ok(vec![WsMessage::text(
                    json!({
                        "method": "SUBSCRIPTION",
                        "params": params,
                    })
                    .to_string(),
                )])
            }
            // The contract server rejects batched params - one frame per subscription
            MarketType::Futures => {
                let params: Vec<serde_json::Value> = match spec.topic.as_str() {
                    "sub.deal" => spec
                        .tickers()
                        .iter()
                        .map(|ticker| json!({"symbol": futures_symbol(ticker)}))
                        .collect(),
                    "sub.kline" => {
                        let Some(interval) = &spec.interval else {
                            return Err(DataError::TimeframeRequired { venue: Venue::Mexc });
                        };
                        spec.tickers()
                            .iter()
                            .map(|ticker| {
                                json!({
                                    "symbol": futures_symbol(ticker),
                                    "interval": interval.as_str(),
                                })
                            })
                            .collect()
                    }
                    _ => vec![json!({})],
                };

                Ok(params
                    .into_iter()
                    .map(|param| {
                        WsMessage::text(
                            json!({
                                "method": spec.topic,
                                "param": param,
                            })
                            .to_string(),
                        )
                    })
                    .collect())
            }
        }
    }

    fn ping_payload(&self, spec: &SubscriptionSpec) -> Option<WsMessage> {
        let method = match spec.market {
            MarketType::Spot => "PING",
            MarketType::Futures => "ping",
        };
        Some(WsMessage::text(json!({"method": method}).to_string()))
    }

    fn decode_frame(
        &self,
        spec: &SubscriptionSpec,
        message: WsMessage,
    ) -> Result<FrameOutcome, SocketError> {
        if spec.market == MarketType::Futures {
            return crate::session::binding::decode_json_frame(message);
        }

        // Spot: data frames are protobuf binary; textual frames are subscription acks and
        // PONG responses
        match message {
            WsMessage::Binary(payload) => {
                let wrapper =
                    proto::PushDataV3ApiWrapper::decode(payload.as_ref()).map_err(|error| {
                        SocketError::DeserialiseBinary {
                            error: serde_json::Error::io(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                error,
                            )),
                            payload: payload.to_vec(),
                        }
                    })?;
                Ok(FrameOutcome::Payload(wrapper.to_value()))
            }
            WsMessage::Text(payload) => {
                debug!(%payload, "mexc spot server sent a textual frame");
                Ok(FrameOutcome::Heartbeat)
            }
            other => crate::session::binding::decode_json_frame(other),
        }
    }
}

impl SocketManager for Mexc {
    fn venue(&self) -> Venue {
        Venue::Mexc
    }

    fn klines_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        timeframe: Timeframe,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let token = interval_token(Venue::Mexc, INTERVALS, timeframe)?;
        let topic = match market {
            MarketType::Spot => TOPIC_SPOT_KLINES,
            MarketType::Futures => "sub.kline",
        };
        let spec = SubscriptionSpec::new(
            Venue::Mexc,
            market,
            topic,
            Some(require_tickers(tickers)?),
        )
        .with_interval(SmolStr::new(token))
        .with_options(options);
        Ok(WsSession::new(spec, &Mexc, callback))
    }

    fn aggtrades_socket(
        &self,
        market: MarketType,
        tickers: &[SmolStr],
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let topic = match market {
            MarketType::Spot => TOPIC_SPOT_AGGTRADES,
            MarketType::Futures => "sub.deal",
        };
        let spec = SubscriptionSpec::new(
            Venue::Mexc,
            market,
            topic,
            Some(require_tickers(tickers)?),
        )
        .with_options(options);
        Ok(WsSession::new(spec, &Mexc, callback))
    }

    fn tickers_socket(
        &self,
        market: MarketType,
        _tickers: Option<&[SmolStr]>,
        callback: StreamCallback,
        options: SessionOptions,
    ) -> Result<WsSession, DataError> {
        let topic = match market {
            MarketType::Spot => TOPIC_SPOT_MINI_TICKERS,
            MarketType::Futures => "sub.tickers",
        };
        let spec = SubscriptionSpec::new(Venue::Mexc, market, topic, None)
            // UTC offset of the mini-ticker window
            .with_interval(SmolStr::new("+8"))
            .with_options(options);
        Ok(WsSession::new(spec, &Mexc, callback))
    }

    // MEXC exposes no public liquidation channel - the default NotImplemented applies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mexc_futures_symbol() {
        assert_eq!(futures_symbol("BTCUSDT"), "BTC_USDT");
        assert_eq!(futures_symbol("BTC_USDT"), "BTC_USDT");
    }

    #[test]
    fn test_mexc_interval_round_trip() {
        use crate::exchange::{interval_from_token, interval_token};

        for (timeframe, token) in INTERVALS {
            assert_eq!(
                interval_from_token(INTERVALS, token),
                Some(*timeframe),
                "{timeframe} failed round trip"
            );
        }

        assert!(interval_token(Venue::Mexc, INTERVALS, Timeframe::M3).is_err());
        assert!(interval_token(Venue::Mexc, INTERVALS, Timeframe::H2).is_err());
    }

    #[test]
    fn test_mexc_futures_subscribe_one_frame_per_ticker() {
        let spec = SubscriptionSpec::new(
            Venue::Mexc,
            MarketType::Futures,
            "sub.deal",
            Some(vec![SmolStr::new("BTCUSDT"), SmolStr::new("ETH_USDT")]),
        );

        let payloads = Mexc.subscribe_payloads(&spec).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"method":"sub.deal","param":{"symbol":"BTC_USDT"}}"#
        );
    }

    #[test]
    fn test_mexc_spot_kline_subscribe_carries_interval() {
        let spec = SubscriptionSpec::new(
            Venue::Mexc,
            MarketType::Spot,
            TOPIC_SPOT_KLINES,
            Some(vec![SmolStr::new("BTCUSDT")]),
        )
        .with_interval(SmolStr::new("Min60"));

        let payloads = Mexc.subscribe_payloads(&spec).unwrap();
        assert_eq!(
            payloads[0].to_text().unwrap(),
            r#"{"method":"SUBSCRIPTION","params":["spot@public.kline.v3.api.pb@BTCUSDT@Min60"]}"#
        );
    }

    #[test]
    fn test_mexc_ping_payload_casing() {
        let spot = SubscriptionSpec::new(Venue::Mexc, MarketType::Spot, "x", None);
        let futures = SubscriptionSpec::new(Venue::Mexc, MarketType::Futures, "x", None);

        assert_eq!(
            Mexc.ping_payload(&spot).unwrap().to_text().unwrap(),
            r#"{"method":"PING"}"#
        );
        assert_eq!(
            Mexc.ping_payload(&futures).unwrap().to_text().unwrap(),
            r#"{"method":"ping"}"#
        );
    }
}
