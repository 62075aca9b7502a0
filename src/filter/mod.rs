//! The gray filter extension.
//!
//! # Data Flow
//! ```text
//! on_http_request_headers:
//!     → classifier (correlation key, rules, marker header)
//!     → correlation store (resolve, then record a fresh Gray)
//!     → add the marker header (`gray: true`) unless the request already has it
//!     → admission controller (admit | 429 terminal response)
//!
//! on_http_response_headers:
//!     → fixed diagnostic headers (+ `app: gray` for Gray requests)
//! ```
//!
//! # Design Decisions
//! - One `GrayExtension` per worker owns its limiter and local store exclusively
//! - The state lock is taken inside a single callback and never held across one
//! - Every host or store failure is logged and degraded; requests never hard-fail

pub mod extension;
pub mod pool;
pub mod request;

pub use extension::{ExtensionState, GrayExtension};
pub use pool::WorkerPool;
pub use request::GrayRequest;

/// Added to responses of Gray requests.
pub const GRAY_RESPONSE_HEADER: (&str, &str) = ("app", "gray");

/// Added to every response.
pub const DIAGNOSTIC_HEADERS: [(&str, &str); 2] = [
    ("who-am-i", "gray-filter"),
    ("injected-by", "gray-proxy"),
];
