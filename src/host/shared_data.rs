//! Key-value store shared by every worker, with compare-and-swap writes.

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Clock, HostError, Retention};

/// Version token handed out by `get` and checked by `put`.
pub type Cas = u32;

/// Host-provided shared data facility.
pub trait SharedData: Send + Sync {
    /// Read a key. `Ok(None)` when the key has never been written or has expired.
    fn get(&self, key: &str) -> Result<Option<(Vec<u8>, Cas)>, HostError>;

    /// Conditionally write a key.
    ///
    /// `expected = None` requires the key to be absent; `Some(cas)` requires the
    /// stored version to equal `cas`. Mismatches return `HostError::CasMismatch`.
    fn put(&self, key: &str, value: &[u8], expected: Option<Cas>) -> Result<(), HostError>;
}

#[derive(Debug, Clone)]
struct SharedEntry {
    value: Vec<u8>,
    cas: Cas,
    inserted_at: Instant,
}

/// In-process shared data backed by a sharded concurrent map.
///
/// The dashmap entry API holds the shard lock only for the duration of one
/// `put`, so each compare-and-swap is atomic per key. Expired entries read as
/// absent and may be overwritten as if they were; a new key arriving at a full
/// store evicts expired entries first, then the oldest ones.
pub struct SharedDataStore {
    entries: DashMap<String, SharedEntry>,
    retention: Retention,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SharedDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDataStore")
            .field("len", &self.entries.len())
            .field("retention", &self.retention)
            .finish()
    }
}

impl SharedDataStore {
    pub fn new(retention: Retention, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
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

    fn is_live(&self, entry: &SharedEntry, now: Instant) -> bool {
        !self.retention.is_expired(entry.inserted_at, now)
    }

    /// Drop expired entries, then the oldest ones, until a new key fits.
    ///
    /// Runs outside any entry lock. Concurrent inserts may overshoot the bound
    /// by a few keys.
    fn make_room(&self, now: Instant) {
        self.entries.retain(|_, entry| self.is_live(entry, now));
        while self.retention.is_full(self.entries.len()) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.inserted_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    tracing::debug!(key = %key, "Evicted oldest shared data entry");
                }
                None => break,
            }
        }
    }
}

impl SharedData for SharedDataStore {
    fn get(&self, key: &str) -> Result<Option<(Vec<u8>, Cas)>, HostError> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if self.is_live(&entry, now) {
                return Ok(Some((entry.value.clone(), entry.cas)));
            }
        }
        self.entries.remove_if(key, |_, entry| !self.is_live(entry, now));
        Ok(None)
    }

    fn put(&self, key: &str, value: &[u8], expected: Option<Cas>) -> Result<(), HostError> {
        let now = self.clock.now();
        if expected.is_none()
            && !self.entries.contains_key(key)
            && self.retention.is_full(self.entries.len())
        {
            self.make_room(now);
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                let live = self.is_live(current, now);
                let swap = match expected {
                    Some(cas) => live && current.cas == cas,
                    // An expired entry counts as absent.
                    None => !live,
                };
                if !swap {
                    return Err(HostError::CasMismatch);
                }
                let next = current.cas.wrapping_add(1).max(1);
                occupied.insert(SharedEntry {
                    value: value.to_vec(),
                    cas: next,
                    inserted_at: now,
                });
                Ok(())
            }
            Entry::Vacant(vacant) => match expected {
                None => {
                    vacant.insert(SharedEntry {
                        value: value.to_vec(),
                        cas: 1,
                        inserted_at: now,
                    });
                    Ok(())
                }
                Some(_) => Err(HostError::CasMismatch),
            },
        }
    }
}
