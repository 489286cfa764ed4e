#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RateLimitConfig;

/// Sliding-window rate limiter guarding the embedding API.
///
/// Tracks the timestamps of recent requests; when the window is full,
/// `acquire` sleeps until the oldest request falls out of it. Not shared
/// across threads; each ingest pipeline owns its own limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: VecDeque<Instant>,
}

impl RateLimiter {
    #[inline]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: VecDeque::with_capacity(max_requests),
        }
    }

    #[inline]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests as usize, config.window())
    }

    /// Block until a request slot is available, then record the request.
    #[inline]
    pub fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            self.evict_expired(now);

            if self.requests.len() < self.max_requests {
                self.requests.push_back(now);
                return;
            }

            // Oldest entry is guaranteed present when the window is full.
            let oldest = self.requests.front().copied().unwrap_or(now);
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            debug!("Rate limit reached, waiting {:?}", wait);
            std::thread::sleep(wait);
        }
    }

    /// Whether a request could proceed right now without waiting.
    #[inline]
    pub fn would_allow(&mut self) -> bool {
        self.evict_expired(Instant::now());
        self.requests.len() < self.max_requests
    }

    /// Number of requests currently inside the window.
    #[inline]
    pub fn in_flight(&mut self) -> usize {
        self.evict_expired(Instant::now());
        self.requests.len()
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(&oldest) = self.requests.front() {
            if now.duration_since(oldest) >= self.window {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }
}
