//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require the auth settings every protected route depends on
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Compile every route to surface pattern and upstream errors
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::{RouteError, RouteTable};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("auth.signing_key is empty (set it or GATEWAY_SIGNING_KEY)")]
    MissingSigningKey,
    #[error("auth.issuer is empty")]
    EmptyIssuer,
    #[error("auth.audience is empty")]
    EmptyAudience,
    #[error("routes are defined both inline and in routes_file")]
    AmbiguousRouteSource,
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("{field} `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },
    #[error("route name `{0}` is used more than once")]
    DuplicateRouteName(String),
    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Validate a fully loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.signing_key.is_empty() {
        errors.push(ValidationError::MissingSigningKey);
    }
    if config.auth.issuer.trim().is_empty() {
        errors.push(ValidationError::EmptyIssuer);
    }
    if config.auth.audience.trim().is_empty() {
        errors.push(ValidationError::EmptyAudience);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.connect_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.upstream_secs"));
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    match RouteTable::compile(&config.routes) {
        Ok(table) => {
            let mut names = HashSet::new();
            for route in table.routes() {
                if !names.insert(route.name.as_str()) {
                    errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
                }
            }
        }
        Err(route_errors) => errors.extend(route_errors.into_iter().map(ValidationError::from)),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
