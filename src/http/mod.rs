//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → routing (match method + path against the current snapshot)
//!     → auth (bearer validation when the route requires it)
//!     → forward.rs (rewrite target and headers, call upstream)
//!     → response.rs (relay upstream response)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, GatewayServer};
