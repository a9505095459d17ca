use marketwire_instrument::{MarketType, Timeframe, Venue};
use marketwire_integration::error::SocketError;
use thiserror::Error;

/// All errors generated in `marketwire-data`.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("{venue} does not offer a {market} market for this stream")]
    MarketMismatch { venue: Venue, market: MarketType },

    #[error("{venue} does not support Timeframe: {timeframe}")]
    TimeframeUnsupported { venue: Venue, timeframe: Timeframe },

    #[error("a timeframe is required for this stream on {venue}")]
    TimeframeRequired { venue: Venue },

    #[error("at least one ticker is required for this stream")]
    TickersRequired,

    #[error("{venue} does not implement: {item}")]
    NotImplemented { venue: Venue, item: &'static str },

    #[error("session is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Adapt(#[from] AdaptError),

    #[error("inbound queue depth {depth} reached bound {bound} - callback is slower than the stream")]
    QueueOverflow { depth: usize, bound: usize },

    #[error("no message received for {idle_secs} seconds")]
    Liveness { idle_secs: u64 },

    #[error("contract table for {venue} did not populate within the timeout")]
    ContractTableTimeout { venue: Venue },

    #[error("SocketError: {0}")]
    Socket(String),
}

impl DataError {
    /// Determine if an error stops the session outright instead of triggering a reconnect.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_terminal(&self) -> bool {
        match self {
            DataError::QueueOverflow { .. } => true,
            _ => false,
        }
    }
}

impl From<SocketError> for DataError {
    fn from(value: SocketError) -> Self {
        Self::Socket(value.to_string())
    }
}

/// Raw venue payload did not match the expected schema.
///
/// Adapt failures are reported with the offending payload and dropped; they never crash a
/// streaming session.
#[derive(Debug, Clone, Error)]
#[error("{venue} adapter error: {reason}")]
pub struct AdaptError {
    pub venue: Venue,
    pub reason: String,
}

impl AdaptError {
    pub fn new<Reason: Into<String>>(venue: Venue, reason: Reason) -> Self {
        Self {
            venue,
            reason: reason.into(),
        }
    }

    /// The venue has no feed or endpoint behind this adapter operation.
    pub fn unsupported(venue: Venue, item: &'static str) -> Self {
        Self {
            venue,
            reason: format!("unsupported operation: {item}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_is_terminal() {
        struct TestCase {
            input: DataError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: queue overflow stops the session
                input: DataError::QueueOverflow {
                    depth: 100,
                    bound: 100,
                },
                expected: true,
            },
            TestCase {
                // TC1: liveness timeout reconnects
                input: DataError::Liveness { idle_secs: 60 },
                expected: false,
            },
            TestCase {
                // TC2: transport faults reconnect
                input: DataError::Socket("connection reset".to_string()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_terminal(), test.expected, "TC{index} failed");
        }
    }
}
