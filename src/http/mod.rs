//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing, timeouts)
//!     → middleware.rs (pick worker, create HTTP context)
//!     → request.rs (request-phase host handle)
//!     → [terminal response | proxy_handler → upstream]
//!     → response.rs (response-phase host handle)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{gray_filter_middleware, with_gray_filter};
pub use request::RequestExchange;
pub use response::ResponseExchange;
pub use server::HttpServer;
