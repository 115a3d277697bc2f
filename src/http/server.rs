//! HTTP server setup and the request pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing)
//! - Run the pipeline: route → authenticate → forward
//! - Apply route table reloads pushed by the config watcher
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, TokenValidator};
use crate::config::validation::validate_config;
use crate::config::{AuthConfig, ConfigError, GatewayConfig, ValidationError};
use crate::error::{GatewayError, GatewayResult};
use crate::http::forward::{self, UpstreamClient};
use crate::http::request::{
    make_span, propagate_request_id_layer, request_id, set_request_id_layer,
};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteStore, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteStore>,
    pub validator: Arc<TokenValidator>,
    pub client: UpstreamClient,
    pub upstream_timeout: Duration,
}

/// The gateway HTTP server.
pub struct GatewayServer {
    router: Router,
    state: AppState,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Build the server from a configuration.
    ///
    /// Fails with `Misconfigured` when the configuration does not validate.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let table = RouteTable::compile(&config.routes).map_err(route_errors)?;
        if table.is_empty() {
            tracing::warn!("Route table is empty; every request will be answered with 404");
        }
        metrics::set_route_count(table.len());

        let state = AppState {
            routes: Arc::new(RouteStore::new(table)),
            validator: Arc::new(TokenValidator::new(&config.auth)),
            client: forward::build_client(&config.timeouts),
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        };

        let router = Self::build_router(state.clone());
        Ok(Self {
            router,
            state,
            config,
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(set_request_id_layer())
    }

    /// The router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The live route store.
    pub fn routes(&self) -> Arc<RouteStore> {
        self.state.routes.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, applying config updates.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.state.routes.snapshot().len(),
            "Gateway listening"
        );

        tokio::spawn(apply_updates(
            self.state.routes.clone(),
            self.config.auth.clone(),
            config_updates,
        ));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn route_errors(errors: Vec<crate::routing::RouteError>) -> GatewayError {
    ConfigError::Validation(errors.into_iter().map(ValidationError::from).collect()).into()
}

/// Swap in route tables from configuration updates until the channel closes.
async fn apply_updates(
    routes: Arc<RouteStore>,
    active_auth: AuthConfig,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
) {
    while let Some(update) = updates.recv().await {
        apply_update(&routes, &active_auth, &update);
    }
}

/// Apply one configuration update. Returns the new table version.
pub fn apply_update(
    routes: &RouteStore,
    active_auth: &AuthConfig,
    update: &GatewayConfig,
) -> Option<u64> {
    if update.auth != *active_auth {
        tracing::warn!("Auth settings changed on disk; they take effect after a restart");
    }

    match RouteTable::compile(&update.routes) {
        Ok(table) => {
            let count = table.len();
            let version = routes.replace(table);
            metrics::record_reload("applied");
            metrics::set_route_count(count);
            tracing::info!(version, routes = count, "Route table replaced");
            Some(version)
        }
        Err(errors) => {
            for e in &errors {
                tracing::error!(error = %e, "Rejected route table update");
            }
            metrics::record_reload("rejected");
            None
        }
    }
}

/// Single entry point for every inbound request.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    // One snapshot for the whole request, even if a reload lands meanwhile.
    let table = state.routes.snapshot();

    let (route_name, result) = match route(&table, &request) {
        Ok(matched) => {
            let name = matched.route.name.clone();
            (name, handle_matched(&state, matched, request, peer, &request_id).await)
        }
        Err(e) => ("none".to_string(), Err(e)),
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            e.log(&request_id);
            if let GatewayError::Unauthenticated(reason) = &e {
                metrics::record_auth_failure(reason.reason());
            }
            e.into_response()
        }
    };

    metrics::record_request(&route_name, &method, response.status().as_u16(), start);
    tracing::debug!(
        request_id = %request_id,
        route = %route_name,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}

/// Stage 1: find the route for the request.
fn route<'t>(table: &'t RouteTable, request: &Request<Body>) -> GatewayResult<RouteMatch<'t>> {
    table
        .resolve(request.method(), request.uri())
        .ok_or_else(|| GatewayError::NotFound {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
        })
}

/// Stages 2 and 3: authenticate if the route demands it, then forward.
async fn handle_matched(
    state: &AppState,
    matched: RouteMatch<'_>,
    request: Request<Body>,
    peer: Option<std::net::IpAddr>,
    request_id: &str,
) -> GatewayResult<Response> {
    if matched.route.requires_auth {
        let claims = auth::authenticate(request.headers(), &state.validator)?;
        tracing::debug!(
            request_id = %request_id,
            subject = claims.sub.as_deref().unwrap_or("-"),
            "Token accepted"
        );
    }

    let (parts, body) = request.into_parts();
    let upstream = matched.route.upstream.to_string();
    let outbound = forward::prepare(parts, body, &matched, peer)?;

    tracing::debug!(
        request_id = %request_id,
        route = %matched.route.name,
        method = %outbound.method(),
        target = %outbound.uri(),
        "Forwarding request"
    );

    forward::forward(&state.client, outbound, &upstream, state.upstream_timeout).await
}
