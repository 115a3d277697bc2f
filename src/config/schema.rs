//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! The gateway file is TOML; the route table may live in a separate JSON file
//! whose entries use the same [`RouteConfig`] shape.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Optional JSON route file. Relative paths resolve against the directory
    /// of the gateway config file.
    pub routes_file: Option<PathBuf>,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Bearer token validation settings.
    pub auth: AuthConfig,

    /// Timeout configuration for upstream calls.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Inline route definitions, consulted in declaration order.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// HMAC algorithms accepted for bearer tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum SigningAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl From<SigningAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        match alg {
            SigningAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            SigningAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            SigningAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

/// Bearer token validation settings.
#[derive(Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected `iss` claim.
    pub issuer: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// Symmetric signing key. `GATEWAY_SIGNING_KEY` overrides it.
    pub signing_key: String,

    /// Signature algorithm tokens must use.
    pub algorithm: SigningAlgorithm,

    /// Clock skew tolerated on `exp` and `nbf`, in seconds.
    pub leeway_secs: u64,
}

// Keeps the signing key out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("signing_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// A single route rule as written in configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    /// Route identifier for logging/metrics. Defaults to `route-<index>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Inbound path pattern, e.g. `/orders/{id}` or `/orders/*`.
    pub match_path: String,

    /// Inbound method to match. Any method when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_method: Option<String>,

    /// Upstream origin, e.g. `http://api:8080`.
    pub upstream_host: String,

    /// Upstream path template using the captures of `match_path`.
    pub upstream_path: String,

    /// Whether a valid bearer token is required.
    #[serde(default = "default_requires_auth")]
    pub requires_auth: bool,
}

fn default_requires_auth() -> bool {
    true
}

/// Route file layout: either `{"routes": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RouteFile {
    Table { routes: Vec<RouteConfig> },
    List(Vec<RouteConfig>),
}

impl RouteFile {
    pub fn into_routes(self) -> Vec<RouteConfig> {
        match self {
            RouteFile::Table { routes } | RouteFile::List(routes) => routes,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until upstream response headers arrive, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_config_uses_camel_case_and_defaults_to_protected() {
        let route: RouteConfig = serde_json::from_str(
            r#"{"matchPath": "/orders/*", "upstreamHost": "http://api:8080", "upstreamPath": "/orders/*"}"#,
        )
        .unwrap();

        assert_eq!(route.match_path, "/orders/*");
        assert_eq!(route.match_method, None);
        assert!(route.requires_auth);
    }

    #[test]
    fn route_file_accepts_both_layouts() {
        let table: RouteFile = serde_json::from_str(
            r#"{"routes": [{"matchPath": "/a", "upstreamHost": "http://a", "upstreamPath": "/a"}]}"#,
        )
        .unwrap();
        let list: RouteFile = serde_json::from_str(
            r#"[{"matchPath": "/a", "upstreamHost": "http://a", "upstreamPath": "/a"}]"#,
        )
        .unwrap();

        assert_eq!(table.into_routes(), list.into_routes());
    }

    #[test]
    fn auth_debug_redacts_key() {
        let auth = AuthConfig {
            signing_key: "super-secret".into(),
            ..AuthConfig::default()
        };
        let rendered = format!("{:?}", auth);
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn minimal_toml_takes_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [auth]
            issuer = "iss"
            audience = "aud"
            signing_key = "k"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.auth.algorithm, SigningAlgorithm::HS256);
        assert_eq!(config.timeouts.upstream_secs, 30);
        assert!(config.routes.is_empty());
    }
}
