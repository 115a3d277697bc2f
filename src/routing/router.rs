//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile `RouteConfig`s into an ordered `RouteTable`
//! - Look up the first route matching a request's method and path
//! - Produce the rewritten upstream target for the match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order; first match wins
//! - Explicit no-match rather than silent default

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Method, Uri};
use thiserror::Error;

use crate::config::RouteConfig;
use crate::routing::matcher::{PathPattern, PathTemplate, PatternError};

/// Why a single route failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteErrorKind {
    #[error("{0}")]
    Pattern(#[from] PatternError),
    #[error("invalid method `{0}`")]
    InvalidMethod(String),
    #[error("upstream host `{0}` must be an absolute http:// origin without a path")]
    InvalidUpstreamHost(String),
}

/// A route that failed to compile, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("route `{route}`: {kind}")]
pub struct RouteError {
    pub route: String,
    pub kind: RouteErrorKind,
}

/// Origin a route forwards to.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    /// Parse `http://host[:port]`. A trailing `/` is tolerated.
    pub fn parse(raw: &str) -> Result<Self, RouteErrorKind> {
        let invalid = || RouteErrorKind::InvalidUpstreamHost(raw.to_string());
        let uri: Uri = raw.parse().map_err(|_| invalid())?;

        let parts = uri.into_parts();
        let scheme = parts.scheme.filter(|s| *s == Scheme::HTTP).ok_or_else(invalid)?;
        let authority = parts.authority.ok_or_else(invalid)?;
        if let Some(pq) = parts.path_and_query {
            if !(pq.path().is_empty() || pq.path() == "/") || pq.query().is_some() {
                return Err(invalid());
            }
        }

        Ok(Self { scheme, authority })
    }

    /// Host and port, as used for the outbound `Host` header.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute URI for `path_and_query` on this upstream.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        let path_and_query: PathAndQuery = path_and_query.parse()?;
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// A compiled route rule.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub name: String,
    pub requires_auth: bool,
    pub upstream: Upstream,
    pattern: PathPattern,
    method: Option<Method>,
    upstream_path: PathTemplate,
}

impl CompiledRoute {
    /// Compile one configured route. `index` names unnamed routes.
    pub fn compile(index: usize, config: &RouteConfig) -> Result<Self, RouteError> {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("route-{}", index));
        let fail = |kind: RouteErrorKind| RouteError {
            route: name.clone(),
            kind,
        };

        let pattern = PathPattern::parse(&config.match_path).map_err(|e| fail(e.into()))?;
        let upstream_path =
            PathTemplate::parse(&config.upstream_path, &pattern).map_err(|e| fail(e.into()))?;
        let upstream = Upstream::parse(&config.upstream_host).map_err(fail)?;
        let method = config
            .match_method
            .as_deref()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| fail(RouteErrorKind::InvalidMethod(m.to_string())))
            })
            .transpose()?;

        Ok(Self {
            name,
            requires_auth: config.requires_auth,
            upstream,
            pattern,
            method,
            upstream_path,
        })
    }

    /// The inbound pattern as configured.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    fn method_matches(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method)
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch<'t> {
    pub route: &'t CompiledRoute,
    /// Rewritten upstream path including the inbound query string.
    pub path_and_query: String,
}

impl RouteMatch<'_> {
    /// Absolute upstream URI for this match.
    pub fn target(&self) -> Result<Uri, axum::http::Error> {
        self.route.upstream.uri_for(&self.path_and_query)
    }
}

/// Ordered, immutable route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    version: u64,
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile every route, reporting all failures at once.
    pub fn compile(configs: &[RouteConfig]) -> Result<Self, Vec<RouteError>> {
        let mut routes = Vec::with_capacity(configs.len());
        let mut errors = Vec::new();

        for (index, config) in configs.iter().enumerate() {
            match CompiledRoute::compile(index, config) {
                Ok(route) => routes.push(route),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(Self { version: 0, routes })
        } else {
            Err(errors)
        }
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Snapshot version, bumped on every reload.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    /// Find the first route matching `method` and `uri`, in declaration order.
    pub fn resolve(&self, method: &Method, uri: &Uri) -> Option<RouteMatch<'_>> {
        let path = uri.path();

        self.routes.iter().find_map(|route| {
            if !route.method_matches(method) {
                return None;
            }
            let captures = route.pattern.captures(path)?;
            let mut path_and_query = route.upstream_path.render(&captures);
            if let Some(query) = uri.query() {
                path_and_query.push('?');
                path_and_query.push_str(query);
            }
            Some(RouteMatch {
                route,
                path_and_query,
            })
        })
    }
}
