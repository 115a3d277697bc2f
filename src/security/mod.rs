//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*, set Host)
//!     → Forward to upstream
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → Relay to client
//! ```
//!
//! # Design Decisions
//! - Connection-level headers never cross the gateway
//! - No trust in client input: authentication lives in `auth`

pub mod headers;
