//! Rolling-window request limiter.
//!
//! Tracks the send time of every request granted inside the current window.
//! `acquire` suspends until the oldest grant falls out of the window when the
//! quota is used up; requests are delayed, never dropped.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Outcome of a non-suspending acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allow,
    Deny { retry_after: Duration },
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    period: Duration,
    granted: VecDeque<Instant>,
}

impl RateLimiter {
    /// Allow at most `max_requests` per rolling `period`. A zero quota is
    /// treated as one request per period.
    pub fn new(max_requests: u32, period: Duration) -> Self {
        let max_requests = (max_requests as usize).max(1);
        Self {
            max_requests,
            period,
            granted: VecDeque::with_capacity(max_requests.min(4096)),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Drop grants that have left the window ending at `now`.
    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.granted.front() {
            if now.duration_since(oldest) >= self.period {
                self.granted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Take a slot if one is free, otherwise report how long until one frees.
    pub fn try_acquire(&mut self) -> RateLimitDecision {
        let now = Instant::now();
        self.evict(now);

        if self.granted.len() < self.max_requests {
            self.granted.push_back(now);
            return RateLimitDecision::Allow;
        }

        // Full window: the oldest grant decides when the next slot opens.
        let retry_after = self
            .granted
            .front()
            .map(|&oldest| self.period.saturating_sub(now.duration_since(oldest)))
            .unwrap_or_default();
        RateLimitDecision::Deny { retry_after }
    }

    /// Suspend until a slot is available, then take it.
    pub async fn acquire(&mut self) {
        loop {
            match self.try_acquire() {
                RateLimitDecision::Allow => return,
                RateLimitDecision::Deny { retry_after } => {
                    debug!(
                        "Rate limit reached ({} per {:?}), waiting {:?}",
                        self.max_requests, self.period, retry_after
                    );
                    tokio::time::sleep(retry_after.max(Duration::from_millis(1))).await;
                }
            }
        }
    }
}
