//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → RouteStore::snapshot (one Arc<RouteTable> per request)
//!     → router.rs (ordered lookup)
//!     → matcher.rs (segment match + upstream path rendering)
//!     → Return: RouteMatch or NoMatch
//!
//! Route Compilation (startup and reload):
//!     RouteConfig[]
//!     → Compile patterns and templates
//!     → Freeze as immutable RouteTable
//!     → RouteStore::replace (atomic swap)
//! ```
//!
//! # Design Decisions
//! - Tables are never mutated in place; reload swaps the whole Arc
//! - In-flight requests keep the snapshot they started with
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

pub use router::{CompiledRoute, RouteError, RouteMatch, RouteTable, Upstream};

/// Holder of the current route table snapshot.
#[derive(Debug)]
pub struct RouteStore {
    current: ArcSwap<RouteTable>,
    next_version: AtomicU64,
}

impl RouteStore {
    /// Create a store serving `table` as version 1.
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table.with_version(1)),
            next_version: AtomicU64::new(2),
        }
    }

    /// The table to use for one request.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    /// Atomically replace the table. Returns the new version.
    pub fn replace(&self, table: RouteTable) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        self.current.store(Arc::new(table.with_version(version)));
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use axum::http::Method;

    fn table(upstream: &str) -> RouteTable {
        RouteTable::compile(&[RouteConfig {
            name: Some("orders".into()),
            match_path: "/orders/*".into(),
            match_method: None,
            upstream_host: upstream.into(),
            upstream_path: "/orders/*".into(),
            requires_auth: false,
        }])
        .unwrap()
    }

    #[test]
    fn snapshot_survives_replace() {
        let store = RouteStore::new(table("http://old:1"));
        let before = store.snapshot();
        assert_eq!(before.version(), 1);

        let version = store.replace(table("http://new:2"));
        assert_eq!(version, 2);

        let uri = "/orders/1".parse().unwrap();
        let old = before.resolve(&Method::GET, &uri).unwrap();
        assert_eq!(old.route.upstream.to_string(), "http://old:1");

        let current = store.snapshot();
        assert_eq!(current.version(), 2);
        let new = current.resolve(&Method::GET, &uri).unwrap();
        assert_eq!(new.route.upstream.to_string(), "http://new:2");
    }
}
