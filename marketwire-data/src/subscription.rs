use futures::future::BoxFuture;
use marketwire_instrument::{MarketType, Venue};
use serde_json::Value;
use smol_str::SmolStr;
use std::{sync::Arc, time::Duration};

/// Async callback invoked by the session worker pool for every decoded inbound frame.
///
/// The convention is to feed raw frames to the callback and let the callback invoke the venue
/// adapter on demand.
pub type StreamCallback = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Tunable session parameters. All values are fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Cadence of custom application-level pings, where the venue binding defines one.
    pub ping_interval: Duration,
    /// Delay between reconnection attempts after a fault.
    pub reconnect_delay: Duration,
    /// Number of workers concurrently consuming the inbound queue.
    ///
    /// Per-symbol ordering is only guaranteed with a single worker.
    pub worker_count: usize,
    /// Bound of the inbound queue; saturation escalates to a session stop.
    pub queue_bound: usize,
    /// Liveness watchdog - reconnect when no message arrives for this long. Zero disables.
    pub no_message_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(30),
            worker_count: 3,
            queue_bound: 100,
            no_message_timeout: Duration::from_secs(60),
        }
    }
}

/// Immutable parameters of one topic-scoped streaming session.
///
/// Created once by a venue socket manager and never mutated; the venue protocol binding derives
/// the connection URI, subscribe payloads and ping payload from it.
#[derive(Clone, Debug)]
pub struct SubscriptionSpec {
    pub venue: Venue,
    pub market: MarketType,
    /// Venue topic this session is scoped to (eg/ `"@aggTrade"`, `"publicTrade"`,
    /// `"candle1H"`).
    pub topic: String,
    /// Tickers to subscribe, where the topic is per-symbol. `None` subscribes the whole market
    /// on venues that support it.
    pub tickers: Option<Vec<SmolStr>>,
    /// Venue interval token for kline topics that carry it in the payload rather than the
    /// topic string (eg/ MEXC `"Min60"`).
    pub interval: Option<SmolStr>,
    pub options: SessionOptions,
}

impl SubscriptionSpec {
    pub fn new<Topic: Into<String>>(
        venue: Venue,
        market: MarketType,
        topic: Topic,
        tickers: Option<Vec<SmolStr>>,
    ) -> Self {
        Self {
            venue,
            market,
            topic: topic.into(),
            tickers,
            interval: None,
            options: SessionOptions::default(),
        }
    }

    pub fn with_interval(mut self, interval: SmolStr) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Tickers of this subscription, empty when subscribing a whole market.
    pub fn tickers(&self) -> &[SmolStr] {
        self.tickers.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Display for SubscriptionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {} {} {}x tickers]",
            self.venue,
            self.market,
            self.topic,
            self.tickers.as_ref().map(Vec::len).unwrap_or_default(),
        )
    }
}
