//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     load config (fall back to defaults) → init logging/metrics
//!     → build worker pool → bind listener → serve
//!
//! Shutdown (Ctrl+C or Shutdown::trigger):
//!     → stop accepting → drain in-flight requests → exit
//! ```
//!
//! # Design Decisions
//! - Extension contexts are dropped with the server; nothing is persisted

pub mod shutdown;

pub use shutdown::Shutdown;
