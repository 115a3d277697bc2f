//! JWT validation and signing.
//!
//! Tokens are HMAC-signed with the configured symmetric key. Validation
//! pins the algorithm, issuer and audience, and requires `exp`.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::config::AuthConfig;

/// `aud` may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Claims the gateway reads from a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub iss: String,
    pub aud: Audience,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Validates bearer tokens against the configured key, issuer and audience.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm.into());
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = config.leeway_secs;

        Self {
            key: DecodingKey::from_secret(config.signing_key.as_bytes()),
            validation,
        }
    }

    /// Verify `token` and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| classify(e.kind()))
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::InvalidIssuer => AuthError::WrongIssuer,
        ErrorKind::InvalidAudience => AuthError::WrongAudience,
        ErrorKind::InvalidAlgorithm => AuthError::WrongAlgorithm,
        ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
        _ => AuthError::MalformedToken,
    }
}

/// Sign `claims` with `secret`. Used by the `mint-token` tool and tests.
pub fn sign(
    claims: &Claims,
    secret: &[u8],
    algorithm: Algorithm,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(&Header::new(algorithm), claims, &EncodingKey::from_secret(secret))
}

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    jsonwebtoken::get_current_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningAlgorithm;

    const KEY: &str = "unit-test-signing-key";

    fn config() -> AuthConfig {
        AuthConfig {
            issuer: "https://issuer.example".into(),
            audience: "orders-api".into(),
            signing_key: KEY.into(),
            algorithm: SigningAlgorithm::HS256,
            leeway_secs: 0,
        }
    }

    fn claims() -> Claims {
        Claims {
            sub: Some("user-1".into()),
            iss: "https://issuer.example".into(),
            aud: Audience::One("orders-api".into()),
            exp: now_secs() + 600,
            iat: Some(now_secs()),
            nbf: None,
            jti: None,
        }
    }

    fn token(claims: &Claims) -> String {
        sign(claims, KEY.as_bytes(), Algorithm::HS256).unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let validator = TokenValidator::new(&config());
        let decoded = validator.validate(&token(&claims())).unwrap();
        assert_eq!(decoded.sub.as_deref(), Some("user-1"));
    }

    #[test]
    fn accepts_audience_list_containing_ours() {
        let mut claims = claims();
        claims.aud = Audience::Many(vec!["other".into(), "orders-api".into()]);
        assert!(TokenValidator::new(&config()).validate(&token(&claims)).is_ok());
    }

    #[test]
    fn rejects_expired_token() {
        let mut claims = claims();
        claims.exp = now_secs() - 120;
        assert_eq!(
            TokenValidator::new(&config()).validate(&token(&claims)),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn leeway_tolerates_small_skew() {
        let mut claims = claims();
        claims.exp = now_secs() - 5;
        let mut config = config();
        config.leeway_secs = 60;
        assert!(TokenValidator::new(&config).validate(&token(&claims)).is_ok());
    }

    #[test]
    fn rejects_future_nbf() {
        let mut claims = claims();
        claims.nbf = Some(now_secs() + 300);
        assert_eq!(
            TokenValidator::new(&config()).validate(&token(&claims)),
            Err(AuthError::NotYetValid)
        );
    }

    #[test]
    fn rejects_wrong_issuer_and_audience() {
        let validator = TokenValidator::new(&config());

        let mut wrong_iss = claims();
        wrong_iss.iss = "https://evil.example".into();
        assert_eq!(validator.validate(&token(&wrong_iss)), Err(AuthError::WrongIssuer));

        let mut wrong_aud = claims();
        wrong_aud.aud = Audience::One("billing-api".into());
        assert_eq!(validator.validate(&token(&wrong_aud)), Err(AuthError::WrongAudience));
    }

    #[test]
    fn rejects_foreign_signature() {
        let forged = sign(&claims(), b"some-other-key", Algorithm::HS256).unwrap();
        assert_eq!(
            TokenValidator::new(&config()).validate(&forged),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn rejects_other_algorithm() {
        let other = sign(&claims(), KEY.as_bytes(), Algorithm::HS512).unwrap();
        assert_eq!(
            TokenValidator::new(&config()).validate(&other),
            Err(AuthError::WrongAlgorithm)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            TokenValidator::new(&config()).validate("not-a-jwt"),
            Err(AuthError::MalformedToken)
        );
    }
}
