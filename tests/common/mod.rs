//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use auth_gateway::auth::jwt::{now_secs, sign, Audience, Claims};
use auth_gateway::config::{GatewayConfig, RouteConfig};
use auth_gateway::{GatewayServer, Shutdown};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const ISSUER: &str = "https://issuer.test";
pub const AUDIENCE: &str = "gateway-tests";
pub const SIGNING_KEY: &str = "integration-signing-key";

/// A request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct UpstreamState {
    label: &'static str,
    delay: Duration,
    received: Arc<Mutex<Vec<Received>>>,
    abandoned: Arc<AtomicUsize>,
}

/// Counts handler futures dropped before they produced a response.
struct InFlight {
    abandoned: Arc<AtomicUsize>,
    finished: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// A mock upstream that records requests and answers with its label.
pub struct MockUpstream {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
    abandoned: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// Requests whose handler was dropped mid-flight.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn upstream_handler(State(state): State<UpstreamState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();

    state.received.lock().unwrap().push(Received {
        method: parts.method.clone(),
        uri: path_and_query.clone(),
        headers: parts.headers,
        body,
    });

    let mut in_flight = InFlight {
        abandoned: state.abandoned.clone(),
        finished: false,
    };
    tokio::time::sleep(state.delay).await;
    in_flight.finished = true;

    (
        StatusCode::ACCEPTED,
        [("x-upstream", state.label), ("content-type", "text/plain")],
        format!("{} {} {}", state.label, parts.method, path_and_query),
    )
        .into_response()
}

/// Start a mock upstream on an ephemeral port.
pub async fn start_upstream(label: &'static str, delay: Duration) -> MockUpstream {
    let received = Arc::new(Mutex::new(Vec::new()));
    let abandoned = Arc::new(AtomicUsize::new(0));
    let state = UpstreamState {
        label,
        delay,
        received: received.clone(),
        abandoned: abandoned.clone(),
    };
    let app = Router::new().fallback(upstream_handler).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream {
        addr,
        received,
        abandoned,
    }
}

/// Send `GET <target>` verbatim over a fresh connection and return the status.
///
/// reqwest normalises dot segments before sending, so paths like
/// `/a/../b` have to be written by hand.
pub async fn raw_get(addr: SocketAddr, target: &str, headers: &[(&str, &str)]) -> u16 {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n", target, addr);
    for (name, value) in headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response);
    response
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap()
}

/// A route to `upstream`.
pub fn route(name: &str, match_path: &str, upstream: &str, upstream_path: &str) -> RouteConfig {
    RouteConfig {
        name: Some(name.into()),
        match_path: match_path.into(),
        match_method: None,
        upstream_host: upstream.into(),
        upstream_path: upstream_path.into(),
        requires_auth: true,
    }
}

pub fn base_config(routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.issuer = ISSUER.into();
    config.auth.audience = AUDIENCE.into();
    config.auth.signing_key = SIGNING_KEY.into();
    config.timeouts.connect_secs = 2;
    config.timeouts.upstream_secs = 5;
    config.routes = routes;
    config
}

/// A running gateway.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = GatewayServer::new(config).expect("valid test config");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        updates,
        shutdown,
    }
}

/// A token for the test issuer/audience expiring `ttl_secs` from now
/// (negative for already expired).
pub fn token(ttl_secs: i64) -> String {
    let exp = (now_secs() as i64 + ttl_secs) as u64;
    let claims = Claims {
        sub: Some("integration-user".into()),
        iss: ISSUER.into(),
        aud: Audience::One(AUDIENCE.into()),
        exp,
        iat: Some(now_secs()),
        nbf: None,
        jti: None,
    };
    sign(&claims, SIGNING_KEY.as_bytes(), jsonwebtoken::Algorithm::HS256).unwrap()
}

pub fn bearer(ttl_secs: i64) -> String {
    format!("Bearer {}", token(ttl_secs))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
