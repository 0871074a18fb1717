use std::time::Duration;

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod limiter;
pub mod poller;
pub mod reporter;
pub mod types;

pub use error::{PollError, TransportError};
pub use poller::{Poller, PollerConfig, spawn_formatted_events};

/// Environment variable holding the start URL (token included).
pub const EVENTS_API_URL_ENV: &str = "EVENTS_API_URL";

/// Production Events API origin.
pub const EVENTS_API_BASE: &str = "https://eventsapi.chaturbate.com";

/// Testbed Events API origin.
pub const TESTBED_EVENTS_API_BASE: &str = "https://events.testbed.cb.dev";

/// Requests per rate-limit window.
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 2000;
pub const DEFAULT_RATE_LIMIT_PERIOD: Duration = Duration::from_secs(60);

/// Attempts per page before a server error or transport failure is fatal.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base backoff delay for retries (doubles each attempt).
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoints a poller may fetch from unless configured otherwise.
pub fn default_allowed_prefixes() -> Vec<String> {
    vec![EVENTS_API_BASE.to_string(), TESTBED_EVENTS_API_BASE.to_string()]
}
