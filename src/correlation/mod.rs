//! Correlation store: one cohort decision per transaction.
//!
//! # Data Flow
//! ```text
//! correlation key
//!     → resolve() → (prior decision, version token)
//!     → [fresh classification if no prior Gray]
//!     → record(key, decision, token)
//!         local.rs  (per-worker map, always succeeds)
//!         shared.rs (host shared data, compare-and-swap)
//! ```
//!
//! # Design Decisions
//! - A conflicting write is informational: another writer already decided
//! - Conflicts are never retried and values are never merged
//! - Store failures degrade to "no prior decision"

pub mod local;
pub mod shared;

pub use local::LocalCorrelationStore;
pub use shared::SharedCorrelationStore;

use thiserror::Error;

use crate::cohort::CohortDecision;
use crate::host::{Cas, HostError};

/// Opaque version observed by `resolve`, passed back to `record`.
///
/// `VersionToken::ABSENT` means the key had no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionToken(pub(crate) Option<Cas>);

impl VersionToken {
    pub const ABSENT: VersionToken = VersionToken(None);

    pub fn is_absent(self) -> bool {
        self.0.is_none()
    }
}

/// Result of looking up a correlation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub decision: CohortDecision,
    pub version: VersionToken,
}

impl Resolved {
    pub fn absent() -> Self {
        Self {
            decision: CohortDecision::Unknown,
            version: VersionToken::ABSENT,
        }
    }
}

/// Outcome of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored,
    /// Another writer updated the key since it was resolved.
    Conflict,
}

/// Errors from a correlation store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// `Unknown` cannot be persisted.
    #[error("cannot record an undecided cohort")]
    Undecided,
}

/// Backing strategy for correlation lookups.
pub trait CorrelationStore: Send {
    fn resolve(&self, key: &str) -> Result<Resolved, StoreError>;

    fn record(
        &mut self,
        key: &str,
        decision: CohortDecision,
        version: VersionToken,
    ) -> Result<RecordOutcome, StoreError>;

    /// Short name for logs.
    fn kind(&self) -> &'static str;
}
