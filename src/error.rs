//! Gateway error taxonomy and its mapping to HTTP responses.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Why the upstream call produced no response.
#[derive(Debug, Error)]
pub enum UpstreamFailure {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("cannot build upstream target: {0}")]
    InvalidTarget(String),
}

/// Errors a request (or startup) can end with.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),

    #[error("no route matches {method} {path}")]
    NotFound { method: String, path: String },

    #[error("upstream {upstream} unavailable: {failure}")]
    UpstreamUnavailable {
        upstream: String,
        failure: UpstreamFailure,
    },

    #[error("misconfigured: {0}")]
    Misconfigured(#[from] ConfigError),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::UpstreamUnavailable {
                failure: UpstreamFailure::Timeout(_),
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unauthenticated(_) => "unauthenticated",
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::UpstreamUnavailable { .. } => "upstream_unavailable",
            GatewayError::Misconfigured(_) => "misconfigured",
        }
    }

    /// Emit the log line for a rejected request.
    pub fn log(&self, request_id: &str) {
        match self {
            GatewayError::Unauthenticated(reason) => tracing::info!(
                request_id = %request_id,
                reason = reason.reason(),
                "Rejected unauthenticated request"
            ),
            GatewayError::NotFound { method, path } => tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "No route matched"
            ),
            GatewayError::UpstreamUnavailable { upstream, failure } => tracing::warn!(
                request_id = %request_id,
                upstream = %upstream,
                error = %failure,
                "Upstream unavailable"
            ),
            GatewayError::Misconfigured(e) => tracing::error!(
                request_id = %request_id,
                error = %e,
                "Gateway misconfigured"
            ),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Public reason phrase only; details stay in the logs.
        let body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
        });

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
