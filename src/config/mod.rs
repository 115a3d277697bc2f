//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml (+ optional routes.json)
//!     → loader.rs (parse, env override, merge route file)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to GatewayServer::new by value
//!
//! On change (file watcher or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server compiles a new RouteTable and swaps it in
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - Only the route table is hot-reloaded; auth settings need a restart
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, RouteConfig,
    SigningAlgorithm, TimeoutConfig,
};
pub use validation::ValidationError;
