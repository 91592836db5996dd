//! Session token issuance and verification
//!
//! Tokens are HS256 JWTs carrying the subject id, username and display
//! name. Keys are derived once and shared through `AppState`.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Which flow issued a token; each has its own lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Registration,
    Login,
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub kind: TokenKind,
}

impl Claims {
    pub fn subject_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed("subject is not a UUID".into()))
    }
}

/// Identity fields a token is issued for
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub name: &'a str,
}

/// Token verification failures. Both variants surface as `InvalidToken`;
/// they are kept apart for logging.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token rejected: {0}")]
    Malformed(String),
}

/// Pre-computed JWT keys
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// Token lifetimes per issuance flow
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub registration_secs: i64,
    pub login_secs: i64,
}

impl TokenLifetimes {
    pub fn for_kind(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Registration => self.registration_secs,
            TokenKind::Login => self.login_secs,
        }
    }
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    lifetimes: TokenLifetimes,
    validation: Arc<Validation>,
}

impl JwtService {
    /// Create a new JWT service with pre-computed keys
    ///
    /// Call once at startup and share through `AppState`.
    pub fn new(secret: &str, registration_expiry_secs: i64, login_expiry_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Self {
            keys: JwtKeys::new(secret),
            lifetimes: TokenLifetimes {
                registration_secs: registration_expiry_secs,
                login_secs: login_expiry_secs,
            },
            validation: Arc::new(validation),
        }
    }

    /// Issue a token for `subject`
    pub fn issue(&self, kind: TokenKind, subject: TokenSubject<'_>) -> anyhow::Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetimes.for_kind(kind));

        let claims = Claims {
            sub: subject.id.to_string(),
            username: subject.username.to_string(),
            name: subject.name.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to sign {:?} token: {}", kind, e))
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new("test-secret", 86400, 604800)
    }

    fn subject(id: Uuid) -> TokenSubject<'static> {
        TokenSubject {
            id,
            username: "alice",
            name: "Alice",
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service.issue(TokenKind::Login, subject(user_id)).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.subject_id().unwrap(), user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.kind, TokenKind::Login);
    }

    #[test]
    fn test_lifetimes_differ_by_kind() {
        let service = create_test_service();
        let id = Uuid::new_v4();

        let reg = service
            .verify(&service.issue(TokenKind::Registration, subject(id)).unwrap())
            .unwrap();
        let login = service
            .verify(&service.issue(TokenKind::Login, subject(id)).unwrap())
            .unwrap();

        assert_eq!(reg.exp - reg.iat, 86400);
        assert_eq!(login.exp - login.iat, 604800);
    }

    #[test]
    fn test_verifying_twice_is_stable() {
        let service = create_test_service();
        let token = service
            .issue(TokenKind::Login, subject(Uuid::new_v4()))
            .unwrap();
        assert_eq!(service.verify(&token).unwrap(), service.verify(&token).unwrap());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new("test-secret", -120, -120);
        let token = service
            .issue(TokenKind::Login, subject(Uuid::new_v4()))
            .unwrap();
        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_test_service()
            .issue(TokenKind::Login, subject(Uuid::new_v4()))
            .unwrap();
        let other = JwtService::new("another-secret", 60, 60);
        assert!(matches!(other.verify(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        let service = create_test_service();
        assert!(matches!(
            service.verify("invalid.token.here"),
            Err(TokenError::Malformed(_))
        ));
        assert!(service.verify("").is_err());
    }

    #[test]
    fn test_service_is_clone_cheap() {
        let service = create_test_service();
        let cloned = service.clone();
        let token = service
            .issue(TokenKind::Registration, subject(Uuid::new_v4()))
            .unwrap();
        assert!(cloned.verify(&token).is_ok());
    }
}
