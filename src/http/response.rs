//! Upstream response relay.
//!
//! # Responsibilities
//! - Hand the upstream status, headers and body back to the client
//! - Drop hop-by-hop headers on the way
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered
//! - Gateway-generated errors are rendered by `GatewayError`

use axum::body::Body;
use axum::response::Response;
use hyper::body::Incoming;

use crate::security::headers::strip_hop_by_hop;

/// Convert an upstream response into the client response.
pub fn relay(response: Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
