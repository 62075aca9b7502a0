//! Gray (canary) traffic filter with correlation and admission control.

pub mod admission;
pub mod classifier;
pub mod cohort;
pub mod config;
pub mod correlation;
pub mod filter;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use cohort::CohortDecision;
pub use config::schema::ProxyConfig;
pub use filter::WorkerPool;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
