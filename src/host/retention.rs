//! Bounded, time-limited retention for correlation entries.

use std::time::{Duration, Instant};

/// How long an entry lives and how many a map may hold.
///
/// Entries older than `ttl` read as absent. A write that would exceed
/// `max_entries` first drops expired entries, then the oldest ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Retention {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self { max_entries, ttl }
    }

    pub fn is_expired(&self, inserted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted_at) >= self.ttl
    }

    /// Whether a map holding `len` entries has to make room before inserting.
    pub fn is_full(&self, len: usize) -> bool {
        len >= self.max_entries
    }
}
