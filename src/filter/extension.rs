//! Long-lived extension context.

use std::sync::{Arc, Mutex};

use crate::admission::{Admission, FixedWindowLimiter};
use crate::classifier::{Classifier, HeaderView};
use crate::cohort::CohortDecision;
use crate::config::ProxyConfig;
use crate::correlation::{CorrelationStore, RecordOutcome};
use crate::filter::request::GrayRequest;
use crate::host::{Clock, HttpContext, RootContext};
use crate::observability::metrics;

/// Mutable state owned by one extension context.
pub struct ExtensionState {
    classifier: Classifier,
    store: Box<dyn CorrelationStore>,
    limiter: FixedWindowLimiter,
    clock: Arc<dyn Clock>,
}

impl ExtensionState {
    pub fn new(
        classifier: Classifier,
        store: Box<dyn CorrelationStore>,
        limiter: FixedWindowLimiter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            classifier,
            store,
            limiter,
            clock,
        }
    }

    /// Classify the request and reconcile with any stored decision.
    pub(crate) fn decide(&mut self, context_id: u32, headers: &dyn HeaderView) -> CohortDecision {
        let Some(key) = self.classifier.correlation_key(headers) else {
            tracing::debug!(context_id, "No correlation key; skipping propagation");
            return self.classifier.classify(headers);
        };

        let prior = match self.store.resolve(&key) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                tracing::warn!(
                    context_id,
                    correlation_key = %key,
                    store = self.store.kind(),
                    error = %e,
                    "Correlation lookup failed; treating as no prior decision"
                );
                metrics::record_store_event("lookup_error");
                None
            }
        };

        if let Some(resolved) = prior {
            if resolved.decision.is_gray() {
                tracing::debug!(context_id, correlation_key = %key, "Correlated gray request");
                return CohortDecision::Gray;
            }
        }

        let decision = self.classifier.classify(headers);
        if !decision.is_gray() {
            return decision;
        }

        // Without a version token from a successful lookup there is nothing to swap against.
        let Some(resolved) = prior else {
            return decision;
        };

        match self.store.record(&key, decision, resolved.version) {
            Ok(RecordOutcome::Stored) => {
                tracing::debug!(context_id, correlation_key = %key, "Recorded gray decision");
                metrics::record_store_event("stored");
            }
            Ok(RecordOutcome::Conflict) => {
                tracing::info!(
                    context_id,
                    correlation_key = %key,
                    "Correlation key already decided by another writer"
                );
                metrics::record_store_event("conflict");
            }
            Err(e) => {
                tracing::warn!(
                    context_id,
                    correlation_key = %key,
                    store = self.store.kind(),
                    error = %e,
                    "Failed to record gray decision"
                );
                metrics::record_store_event("write_error");
            }
        }
        decision
    }

    pub(crate) fn admit(&mut self) -> Admission {
        let now = self.clock.now();
        self.limiter.try_acquire(now)
    }

    pub fn remaining_tokens(&self) -> u32 {
        self.limiter.remaining()
    }

    pub(crate) fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

/// Root context for one worker.
#[derive(Clone)]
pub struct GrayExtension {
    worker_id: usize,
    state: Arc<Mutex<ExtensionState>>,
}

impl GrayExtension {
    pub fn new(worker_id: usize, state: ExtensionState) -> Self {
        Self {
            worker_id,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Build a context from configuration with the given store and clock.
    pub fn from_config(
        worker_id: usize,
        config: &ProxyConfig,
        store: Box<dyn CorrelationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = FixedWindowLimiter::from_config(&config.rate_limit, clock.now());
        let classifier = Classifier::from_config(&config.filter);
        Self::new(worker_id, ExtensionState::new(classifier, store, limiter, clock))
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn remaining_tokens(&self) -> u32 {
        self.state
            .lock()
            .expect("extension state mutex poisoned")
            .remaining_tokens()
    }
}

impl RootContext for GrayExtension {
    fn on_configure(&mut self) -> bool {
        let state = self.state.lock().expect("extension state mutex poisoned");
        tracing::info!(
            worker_id = self.worker_id,
            rules = state.classifier.rules().len(),
            store = state.store.kind(),
            capacity = state.limiter.capacity(),
            "Gray filter configured"
        );
        // Rule errors already degraded to an empty set; never refuse to start.
        true
    }

    fn create_http_context(&self, context_id: u32) -> Box<dyn HttpContext> {
        Box::new(GrayRequest::new(context_id, self.state.clone()))
    }
}
