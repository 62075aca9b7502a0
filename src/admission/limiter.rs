//! Fixed-window request limiter.

use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Verdict for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject,
}

/// Grants `capacity` permits per refill interval.
#[derive(Debug, Clone)]
pub struct FixedWindowLimiter {
    capacity: u32,
    refill_interval: Duration,
    remaining: u32,
    last_refill: Instant,
}

impl FixedWindowLimiter {
    /// Create a full limiter whose first window starts at `now`.
    pub fn new(capacity: u32, refill_interval: Duration, now: Instant) -> Self {
        Self {
            capacity,
            refill_interval,
            remaining: capacity,
            last_refill: now,
        }
    }

    pub fn from_config(config: &RateLimitConfig, now: Instant) -> Self {
        Self::new(
            config.capacity,
            Duration::from_millis(config.refill_interval_ms),
            now,
        )
    }

    /// Refill if the window elapsed, then try to take one permit.
    pub fn try_acquire(&mut self, now: Instant) -> Admission {
        self.refill(now);

        if self.remaining > 0 {
            self.remaining -= 1;
            Admission::Admit
        } else {
            Admission::Reject
        }
    }

    fn refill(&mut self, now: Instant) {
        // saturating: an earlier `now` counts as zero elapsed and never rewinds the window
        if now.saturating_duration_since(self.last_refill) >= self.refill_interval {
            self.remaining = self.capacity;
            self.last_refill = now;
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }
}
