//! Worker pool of extension contexts.
//!
//! Each worker stands in for one host thread with its own root context.
//! Requests are spread round-robin, so rate limits apply per worker.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::{ProxyConfig, StoreMode};
use crate::correlation::{CorrelationStore, LocalCorrelationStore, SharedCorrelationStore};
use crate::filter::extension::GrayExtension;
use crate::host::{Clock, HttpContext, RootContext, SharedDataStore, SystemClock};

/// Set of extension contexts attached to one listener.
pub struct WorkerPool {
    workers: Vec<GrayExtension>,
    shared: Option<Arc<SharedDataStore>>,
    counter: AtomicUsize,
    next_context_id: AtomicU32,
}

impl WorkerPool {
    /// Build the pool with the system clock.
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ProxyConfig, clock: Arc<dyn Clock>) -> Self {
        let retention = config.filter.retention();
        let shared = match config.filter.store {
            StoreMode::Shared => Some(Arc::new(SharedDataStore::new(retention, clock.clone()))),
            StoreMode::Local => None,
        };

        let workers = (0..config.filter.workers.max(1))
            .map(|worker_id| {
                let store: Box<dyn CorrelationStore> = match &shared {
                    Some(data) => Box::new(SharedCorrelationStore::new(data.clone())),
                    None => Box::new(LocalCorrelationStore::new(retention, clock.clone())),
                };
                let mut worker =
                    GrayExtension::from_config(worker_id, config, store, clock.clone());
                if !worker.on_configure() {
                    tracing::warn!(worker_id, "Worker rejected configuration");
                }
                worker
            })
            .collect();

        Self {
            workers,
            shared,
            counter: AtomicUsize::new(0),
            next_context_id: AtomicU32::new(1),
        }
    }

    /// Pick the next worker in rotation.
    pub fn next_worker(&self) -> &GrayExtension {
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        &self.workers[index]
    }

    /// Create the HTTP context for a new request.
    pub fn create_http_context(&self) -> Box<dyn HttpContext> {
        let context_id = self.next_context_id.fetch_add(1, Ordering::Relaxed);
        self.next_worker().create_http_context(context_id)
    }

    pub fn workers(&self) -> &[GrayExtension] {
        &self.workers
    }

    /// The shared data store, when running in shared mode.
    pub fn shared_store(&self) -> Option<&Arc<SharedDataStore>> {
        self.shared.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let mut config = ProxyConfig::default();
        config.filter.workers = 3;
        let pool = WorkerPool::from_config(&config);

        let ids: Vec<_> = (0..4).map(|_| pool.next_worker().worker_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_store_mode() {
        let mut config = ProxyConfig::default();
        assert!(WorkerPool::from_config(&config).shared_store().is_none());

        config.filter.store = StoreMode::Shared;
        assert!(WorkerPool::from_config(&config).shared_store().is_some());
    }

    #[test]
    fn test_limits_are_per_worker() {
        let mut config = ProxyConfig::default();
        config.filter.workers = 2;
        config.rate_limit.capacity = 5;
        let pool = WorkerPool::from_config(&config);

        assert!(pool.workers().iter().all(|w| w.remaining_tokens() == 5));
    }
}
