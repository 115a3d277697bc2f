//! Bearer authentication.
//!
//! # Data Flow
//! ```text
//! Matched route requires auth
//!     → bearer.rs (pull token from Authorization header)
//!     → jwt.rs (signature, algorithm, iss, aud, exp, nbf)
//!     → Claims, or AuthError → 401
//! ```
//!
//! # Design Decisions
//! - All-or-nothing: any failed check rejects the request
//! - The reason is logged and counted but never sent to the client
//! - Tokens are never stored; claims live for one request

pub mod bearer;
pub mod jwt;

use axum::http::HeaderMap;
use thiserror::Error;

pub use bearer::bearer_token;
pub use jwt::{Audience, Claims, TokenValidator};

/// Why a request failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("malformed token")]
    MalformedToken,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token uses an unexpected algorithm")]
    WrongAlgorithm,
    #[error("token issuer does not match")]
    WrongIssuer,
    #[error("token audience does not match")]
    WrongAudience,
    #[error("token is missing the `{0}` claim")]
    MissingClaim(String),
    #[error("token expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
}

impl AuthError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::WrongAlgorithm => "wrong_algorithm",
            AuthError::WrongIssuer => "wrong_issuer",
            AuthError::WrongAudience => "wrong_audience",
            AuthError::MissingClaim(_) => "missing_claim",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
        }
    }
}

/// Authenticate a request from its headers.
pub fn authenticate(headers: &HeaderMap, validator: &TokenValidator) -> Result<Claims, AuthError> {
    let token = bearer_token(headers)?;
    validator.validate(token)
}
