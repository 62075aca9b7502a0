//! Host runtime embedding contract.
//!
//! # Data Flow
//! ```text
//! Host attaches extension
//!     → RootContext (one per worker, long-lived)
//!     → create_http_context() per inbound request
//!     → HttpContext callbacks:
//!         on_http_request_headers → [terminal response | continue]
//!         on_http_response_headers
//!         on_done
//! ```
//!
//! # Design Decisions
//! - Every callback has a no-op default; extensions override only what they need
//! - Host calls are synchronous and return `Result`, never panic
//! - Shared data is the only state that crosses worker boundaries (CAS, no locks)
//! - Correlation entries expire after a TTL; full maps evict the oldest entry

pub mod clock;
pub mod context;
pub mod retention;
pub mod shared_data;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{Action, HttpContext, HttpHost, RootContext};
pub use retention::Retention;
pub use shared_data::{Cas, SharedData, SharedDataStore};

use thiserror::Error;

/// Errors returned by host calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// A conditional write saw a different version than expected.
    #[error("compare-and-swap mismatch")]
    CasMismatch,

    /// A status code or header cannot be represented on the wire.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The host cannot serve the call right now (wrong phase, store offline, ...).
    #[error("host unavailable: {0}")]
    Unavailable(String),
}
