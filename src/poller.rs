use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{Transport, check_allowed, redact};
use crate::dispatcher::{Dispatch, dispatch};
use crate::error::{PollError, Result, TransportError};
use crate::limiter::RateLimiter;
use crate::reporter::{ChannelSink, EventSink};
use crate::types::{Page, PollSummary};
use crate::{
    DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT_PERIOD,
    DEFAULT_RATE_LIMIT_REQUESTS, default_allowed_prefixes,
};

/// Everything a poller needs besides its transport and sink.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// First page of the feed.
    pub start_url: String,
    /// Endpoint prefixes every fetched URL must fall under.
    pub allowed_prefixes: Vec<String>,
    /// Total attempts per page before a transient failure becomes fatal.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base: Duration,
    pub rate_limit_requests: u32,
    pub rate_limit_period: Duration,
}

impl PollerConfig {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            allowed_prefixes: default_allowed_prefixes(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            rate_limit_requests: DEFAULT_RATE_LIMIT_REQUESTS,
            rate_limit_period: DEFAULT_RATE_LIMIT_PERIOD,
        }
    }

    /// Backoff before retry number `retry` (0-based): `base * 2^retry`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Result of fetching one URL, before the body is interpreted.
enum Fetched {
    Body(Vec<u8>),
    NotFound,
}

/// Drives the fetch, dispatch and advance cycle over the events feed.
pub struct Poller<T, S> {
    config: PollerConfig,
    transport: T,
    sink: S,
    limiter: RateLimiter,
    summary: PollSummary,
    sink_closed: bool,
}

impl<T: Transport, S: EventSink> Poller<T, S> {
    pub fn new(config: PollerConfig, transport: T, sink: S) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_period);
        Self {
            config,
            transport,
            sink,
            limiter,
            summary: PollSummary::default(),
            sink_closed: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn summary(&self) -> &PollSummary {
        &self.summary
    }

    /// Poll from the start URL until the feed signals completion.
    ///
    /// Returns normally when a page has no `nextUrl`, on HTTP 404, or when the
    /// sink stops accepting events. Dropping the returned future abandons any
    /// request in flight.
    pub async fn run(&mut self) -> Result<PollSummary> {
        info!("Polling events from {}", redact(&self.config.start_url));

        let mut cursor = Some(self.config.start_url.clone());
        while let Some(url) = cursor {
            cursor = self.get_events(&url).await?;
        }

        info!(
            "Feed exhausted after {} page(s), {} event(s)",
            self.summary.pages_fetched, self.summary.events_received
        );
        Ok(self.summary.clone())
    }

    /// Fetch one page, dispatch its events in order, and return the next URL.
    pub async fn get_events(&mut self, url: &str) -> Result<Option<String>> {
        check_allowed(url, &self.config.allowed_prefixes)?;

        let body = match self.fetch_with_retry(url).await? {
            Fetched::Body(body) => body,
            Fetched::NotFound => {
                info!("Feed returned 404 for {}, stopping", redact(url));
                return Ok(None);
            }
        };

        let page: Page = serde_json::from_slice(&body)?;
        self.summary.pages_fetched += 1;

        let (events, next_url) = page.into_parts();
        debug!("Page with {} event(s)", events.len());

        for value in events {
            self.summary.events_received += 1;
            match dispatch(value) {
                Dispatch::Formatted(event) => {
                    self.summary.events_formatted += 1;
                    if self.sink.emit(&event).is_err() {
                        info!("Event sink closed, stopping");
                        self.sink_closed = true;
                        return Ok(None);
                    }
                }
                Dispatch::Skipped { .. } => self.summary.events_skipped += 1,
                Dispatch::Unrecognized { .. } => self.summary.events_unrecognized += 1,
            }
        }

        Ok(next_url)
    }

    /// True once the sink has rejected an event.
    pub fn sink_closed(&self) -> bool {
        self.sink_closed
    }

    /// GET `url`, retrying server errors and transport failures with
    /// exponential backoff. Every attempt takes a rate-limiter slot first.
    async fn fetch_with_retry(&mut self, url: &str) -> Result<Fetched> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            self.limiter.acquire().await;
            attempt += 1;

            let err = match self.transport.get(url).await {
                Ok(resp) => match resp.status {
                    200 => return Ok(Fetched::Body(resp.body)),
                    404 => return Ok(Fetched::NotFound),
                    status if status >= 500 => TransportError::ServerError(status),
                    status => return Err(PollError::UnexpectedStatus { status }),
                },
                Err(e) => e,
            };

            if attempt >= max_attempts {
                warn!("Giving up on {} after {attempt} attempt(s): {err}", redact(url));
                return Err(PollError::Transport {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.config.backoff_delay(attempt - 1);
            warn!(
                "Fetch failed (attempt {attempt}/{max_attempts}): {err}, retrying in {delay:?}"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Run a poller on its own task and stream formatted lines back.
///
/// Dropping the receiver stops the poller at the next formatted event.
pub fn spawn_formatted_events<T>(
    config: PollerConfig,
    transport: T,
) -> (mpsc::UnboundedReceiver<String>, JoinHandle<Result<PollSummary>>)
where
    T: Transport + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let mut poller = Poller::new(config, transport, ChannelSink::new(tx));
    let handle = tokio::spawn(async move { poller.run().await });
    (rx, handle)
}
