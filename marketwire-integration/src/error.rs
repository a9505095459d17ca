use thiserror::Error;

/// All transport IO related errors generated in `marketwire-integration`.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Sink error")]
    Sink,

    #[error("Deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("Deserialising JSON error: {error} for binary payload: {payload:?}")]
    DeserialiseBinary {
        error: serde_json::Error,
        payload: Vec<u8>,
    },

    #[error("Serialising JSON error: {0}")]
    Serialise(serde_json::Error),

    #[error("error parsing Url: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("error subscribing to resources over the socket: {0}")]
    Subscribe(String),

    #[error("stream terminated with closing frame: {0}")]
    Terminated(String),

    #[error("{entity} does not support: {item}")]
    Unsupported { entity: &'static str, item: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("error decompressing gzip frame: {0}")]
    Decompress(std::io::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("HTTP request timed out")]
    HttpTimeout(reqwest::Error),

    /// REST http response error - carries the venue's status code and response body.
    #[error("HTTP response (status={0}) error: {1}")]
    HttpResponse(reqwest::StatusCode, String),

    #[error("HTTP request exhausted the retry budget after {attempts} attempts")]
    RetriesExhausted { attempts: u8 },
}

impl SocketError {
    /// True iff this error is the venue telling us to slow down (HTTP 429).
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            SocketError::HttpResponse(status, _)
                if *status == reqwest::StatusCode::TOO_MANY_REQUESTS
        )
    }

    /// True iff this error is a timeout-class transport failure, the only class the REST retry
    /// policy will re-attempt.
    pub fn is_transport_timeout(&self) -> bool {
        matches!(self, SocketError::HttpTimeout(_))
    }
}

impl From<reqwest::Error> for SocketError {
    fn from(error: reqwest::Error) -> Self {
        match error {
            error if error.is_timeout() => SocketError::HttpTimeout(error),
            error => SocketError::Http(error),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SocketError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        SocketError::WebSocket(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_error_is_rate_limit() {
        struct TestCase {
            input: SocketError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: 429 response is a rate limit
                input: SocketError::HttpResponse(
                    reqwest::StatusCode::TOO_MANY_REQUESTS,
                    "Rate limit is violated".to_string(),
                ),
                expected: true,
            },
            TestCase {
                // TC1: 500 response is not a rate limit
                input: SocketError::HttpResponse(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    "boom".to_string(),
                ),
                expected: false,
            },
            TestCase {
                // TC2: non-http error is not a rate limit
                input: SocketError::Sink,
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_rate_limit(), test.expected, "TC{index} failed");
        }
    }
}
