//! services/api/src/web/token.rs
//!
//! Signs and verifies the compact bearer tokens issued at login.
//!
//! A token carries the principal's id, role and email plus an embedded 24h
//! expiry. Verification here only covers signature and expiry; the session
//! store is consulted separately so server-side revocation always wins.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dtai_core::domain::Role;

/// How long both the token's embedded expiry and the session row are valid.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Claims embedded in every issued token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the principal id.
    pub sub: String,
    pub role: String,
    pub email: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn principal_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| TokenError::Invalid("subject is not a valid id".to_string()))
    }

    pub fn role(&self) -> Result<Role, TokenError> {
        Role::parse(&self.role)
            .ok_or_else(|| TokenError::Invalid(format!("unknown role '{}'", self.role)))
    }
}

/// HS256 token codec shared by the login handler and the auth gate.
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: String) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 60; // 60 seconds leeway for clock skew

        Self { secret, validation }
    }

    /// Signs a fresh token for this principal, valid for [`SESSION_TTL_HOURS`].
    pub fn issue(&self, principal_id: Uuid, role: Role, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal_id.to_string(),
            role: role.as_str().to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))
    }

    /// Verifies signature and embedded expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &self.validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })
    }

    /// Extracts the bearer token from an `Authorization` header value.
    pub fn extract_bearer(auth_header: &str) -> Option<&str> {
        auth_header
            .strip_prefix("Bearer ")
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(secret.to_string())
    }

    #[test]
    fn issue_then_verify_roundtrips_the_claims() {
        let codec = codec("test-secret-key");
        let id = Uuid::new_v4();

        let token = codec.issue(id, Role::Staff, "dir@uteq.edu.mx").unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.principal_id().unwrap(), id);
        assert_eq!(claims.role().unwrap(), Role::Staff);
        assert_eq!(claims.email, "dir@uteq.edu.mx");
        assert!(claims.exp - claims.iat == SESSION_TTL_HOURS * 3600);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let codec = codec("test-secret-key");
        let now = Utc::now().timestamp();
        // Expired beyond the 60s leeway.
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: "staff".to_string(),
            email: "dir@uteq.edu.mx".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key"),
        )
        .unwrap();

        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let token = codec("secret-one")
            .issue(Uuid::new_v4(), Role::Teacher, "prof@uteq.edu.mx")
            .unwrap();

        assert!(matches!(
            codec("secret-two").verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(
            TokenCodec::extract_bearer("Bearer abc.def.ghi"),
            Some("abc.def.ghi")
        );
        assert_eq!(TokenCodec::extract_bearer("Token abc"), None);
        assert_eq!(TokenCodec::extract_bearer("Bearer "), None);
    }
}
