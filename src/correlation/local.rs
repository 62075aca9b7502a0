//! Per-worker correlation map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::{CorrelationStore, RecordOutcome, Resolved, StoreError, VersionToken};
use crate::cohort::CohortDecision;
use crate::host::{Clock, Retention};

#[derive(Debug, Clone)]
struct LocalEntry {
    decision: CohortDecision,
    version: u32,
    inserted_at: Instant,
}

/// Correlation map owned by a single extension context.
///
/// Only the owning worker touches it, so writes never conflict. Entries expire
/// after the retention TTL, and recording a new key into a full map evicts
/// expired entries first, then the oldest one.
pub struct LocalCorrelationStore {
    entries: HashMap<String, LocalEntry>,
    retention: Retention,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LocalCorrelationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCorrelationStore")
            .field("len", &self.entries.len())
            .field("retention", &self.retention)
            .finish()
    }
}

impl LocalCorrelationStore {
    pub fn new(retention: Retention, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            retention,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&mut self, now: Instant) {
        let retention = self.retention;
        self.entries
            .retain(|_, entry| !retention.is_expired(entry.inserted_at, now));
        while retention.is_full(self.entries.len()) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    tracing::debug!(key = %key, "Evicted oldest local correlation entry");
                }
                None => break,
            }
        }
    }
}

impl CorrelationStore for LocalCorrelationStore {
    fn resolve(&self, key: &str) -> Result<Resolved, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !self.retention.is_expired(entry.inserted_at, now))
            .map(|entry| Resolved {
                decision: entry.decision,
                version: VersionToken(Some(entry.version)),
            })
            .unwrap_or_else(Resolved::absent))
    }

    fn record(
        &mut self,
        key: &str,
        decision: CohortDecision,
        _version: VersionToken,
    ) -> Result<RecordOutcome, StoreError> {
        if decision == CohortDecision::Unknown {
            return Err(StoreError::Undecided);
        }
        let now = self.clock.now();
        if !self.entries.contains_key(key) && self.retention.is_full(self.entries.len()) {
            self.make_room(now);
        }
        let entry = self.entries.entry(key.to_string()).or_insert(LocalEntry {
            decision,
            version: 0,
            inserted_at: now,
        });
        entry.decision = decision;
        entry.version = entry.version.wrapping_add(1);
        entry.inserted_at = now;
        Ok(RecordOutcome::Stored)
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}
