//! Admission control.
//!
//! # Data Flow
//! ```text
//! Classified request
//!     → limiter.rs (refill window check, consume one token)
//!     → Admit: continue to upstream
//!     → Reject: terminal 429 response
//! ```
//!
//! # Design Decisions
//! - Fixed window: a full reset once the refill interval has elapsed, no trickle
//! - One limiter per extension context; limits are per worker, not global
//! - Capacity and interval are fixed at context creation

pub mod limiter;

pub use limiter::{Admission, FixedWindowLimiter};

/// Status code of the throttle response.
pub const THROTTLE_STATUS: u16 = 429;
/// Diagnostic header attached to the throttle response.
pub const THROTTLE_HEADER: (&str, &str) = ("powered-by", "gray-proxy");
/// Body of the throttle response.
pub const THROTTLE_BODY: &[u8] = b"rate limited, wait and retry.";
