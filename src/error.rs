use thiserror::Error;

/// Failure of a single HTTP exchange. All variants are considered transient
/// and are retried with backoff by the poller.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server error: HTTP {0}")]
    ServerError(u16),

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a poll run.
#[derive(Debug, Error)]
pub enum PollError {
    /// The URL does not start with any allow-listed events endpoint.
    #[error("url is not an allowed events endpoint: {0}")]
    DisallowedUrl(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Retries were exhausted on server errors or transport failures.
    #[error("giving up after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("unexpected HTTP status {status} from events endpoint")]
    UnexpectedStatus { status: u16 },

    /// A 200 response whose body is not a valid page document.
    #[error("malformed events page: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PollError {
    /// True for errors raised before any request was attempted.
    pub fn is_config(&self) -> bool {
        matches!(self, PollError::DisallowedUrl(_) | PollError::Config(_))
    }
}

pub type Result<T, E = PollError> = std::result::Result<T, E>;
