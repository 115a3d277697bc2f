//! Outbound forwarding to upstreams.
//!
//! # Responsibilities
//! - Build the outbound request for a matched route
//! - Send it over the pooled client under the upstream deadline
//! - Map transport failures to `UpstreamUnavailable`
//!
//! # Design Decisions
//! - Request bodies stream straight through
//! - Dropping the returned future cancels the outbound call and releases
//!   its connection, which is what happens when the client disconnects
//! - No retries

use std::net::IpAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, request::Parts, Request, Version};
use axum::response::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::error::{GatewayError, UpstreamFailure};
use crate::http::response::relay;
use crate::routing::RouteMatch;
use crate::security::headers::prepare_forwarded;

pub type UpstreamClient = Client<HttpConnector, Body>;

/// Pooled HTTP client for all upstreams.
pub fn build_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new()).build(connector)
}

/// Build the outbound request for `matched` from the inbound parts and body.
pub fn prepare(
    mut parts: Parts,
    body: Body,
    matched: &RouteMatch<'_>,
    peer: Option<IpAddr>,
) -> Result<Request<Body>, GatewayError> {
    let upstream = &matched.route.upstream;
    let target = matched
        .target()
        .map_err(|e| GatewayError::UpstreamUnavailable {
            upstream: upstream.to_string(),
            failure: UpstreamFailure::InvalidTarget(e.to_string()),
        })?;

    let original_host = parts
        .headers
        .get(header::HOST)
        .cloned()
        .or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|a| header::HeaderValue::from_str(a.as_str()).ok())
        });
    prepare_forwarded(&mut parts.headers, peer, original_host, upstream.authority());

    parts.uri = target;
    parts.version = Version::HTTP_11;

    Ok(Request::from_parts(parts, body))
}

/// Send `request` upstream and relay whatever comes back.
pub async fn forward(
    client: &UpstreamClient,
    request: Request<Body>,
    upstream: &str,
    deadline: Duration,
) -> Result<Response, GatewayError> {
    let unavailable = |failure| GatewayError::UpstreamUnavailable {
        upstream: upstream.to_string(),
        failure,
    };

    match tokio::time::timeout(deadline, client.request(request)).await {
        Ok(Ok(response)) => Ok(relay(response)),
        Ok(Err(e)) if e.is_connect() => Err(unavailable(UpstreamFailure::Connect(error_chain(&e)))),
        Ok(Err(e)) => Err(unavailable(UpstreamFailure::Request(error_chain(&e)))),
        Err(_) => Err(unavailable(UpstreamFailure::Timeout(deadline))),
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::routing::RouteTable;
    use axum::http::{Method, Uri};

    #[test]
    fn prepare_rewrites_target_and_headers() {
        let table = RouteTable::compile(&[RouteConfig {
            name: Some("orders".into()),
            match_path: "/orders/*".into(),
            match_method: None,
            upstream_host: "http://api:8080".into(),
            upstream_path: "/orders/*".into(),
            requires_auth: true,
        }])
        .unwrap();

        let inbound = Request::builder()
            .method(Method::POST)
            .uri("/orders/42?verbose=1")
            .header(header::HOST, "gateway.example")
            .header(header::CONNECTION, "close")
            .header(header::AUTHORIZATION, "Bearer t")
            .body(Body::from("payload"))
            .unwrap();
        let (parts, body) = inbound.into_parts();
        let uri: Uri = parts.uri.clone();
        let matched = table.resolve(&parts.method, &uri).unwrap();

        let outbound = prepare(parts, body, &matched, Some("10.1.2.3".parse().unwrap())).unwrap();

        assert_eq!(outbound.method(), Method::POST);
        assert_eq!(outbound.uri().to_string(), "http://api:8080/orders/42?verbose=1");
        assert_eq!(outbound.headers()[header::HOST], "api:8080");
        assert_eq!(outbound.headers()["x-forwarded-host"], "gateway.example");
        assert_eq!(outbound.headers()["x-forwarded-for"], "10.1.2.3");
        assert_eq!(outbound.headers()[header::AUTHORIZATION], "Bearer t");
        assert!(!outbound.headers().contains_key(header::CONNECTION));
    }

    #[tokio::test]
    async fn refused_connection_is_bad_gateway() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = build_client(&TimeoutConfig::default());
        let request = Request::builder()
            .uri(format!("http://{}/", addr))
            .body(Body::empty())
            .unwrap();

        let err = forward(&client, request, &addr.to_string(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
