//! Correlation lookups through the host's shared data.

use std::sync::Arc;

use super::{CorrelationStore, RecordOutcome, Resolved, StoreError, VersionToken};
use crate::cohort::CohortDecision;
use crate::host::{HostError, SharedData};

/// Correlation store visible to every worker.
#[derive(Clone)]
pub struct SharedCorrelationStore {
    data: Arc<dyn SharedData>,
}

impl SharedCorrelationStore {
    pub fn new(data: Arc<dyn SharedData>) -> Self {
        Self { data }
    }
}

impl std::fmt::Debug for SharedCorrelationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCorrelationStore").finish_non_exhaustive()
    }
}

impl CorrelationStore for SharedCorrelationStore {
    fn resolve(&self, key: &str) -> Result<Resolved, StoreError> {
        match self.data.get(key) {
            Ok(Some((value, cas))) => Ok(Resolved {
                decision: CohortDecision::from_marker(&value),
                version: VersionToken(Some(cas)),
            }),
            Ok(None) | Err(HostError::NotFound) => Ok(Resolved::absent()),
            Err(e) => Err(e.into()),
        }
    }

    fn record(
        &mut self,
        key: &str,
        decision: CohortDecision,
        version: VersionToken,
    ) -> Result<RecordOutcome, StoreError> {
        let marker = decision.marker().ok_or(StoreError::Undecided)?;
        match self.data.put(key, marker.as_bytes(), version.0) {
            Ok(()) => Ok(RecordOutcome::Stored),
            Err(HostError::CasMismatch) => Ok(RecordOutcome::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    fn kind(&self) -> &'static str {
        "shared"
    }
}
