//! Signed, time-bounded bearer tokens (HS256 JWT).
//!
//! The signing secret is loaded once at startup. An empty secret is allowed so the
//! server can still boot, but every attempt to issue a token then fails.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("no token signing secret configured")]
    MissingKey,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid or expired token")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and validates bearer tokens whose subject is a user id.
#[cfg_attr(test, mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: i64) -> Result<String, TokenError>;

    /// Returns the user id of a valid, unexpired token.
    fn verify(&self, token: &str) -> Result<i64, TokenError>;
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// HMAC-SHA256 JWT implementation of TokenService.
pub struct JwtTokenService {
    keys: Option<Keys>,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let keys = (!secret.is_empty()).then(|| Keys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });

        Self { keys, ttl }
    }

    pub fn has_key(&self) -> bool {
        self.keys.is_some()
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingKey)?;

        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding)
            .map_err(TokenError::Signing)
    }

    fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingKey)?;

        let data = jsonwebtoken::decode::<Claims>(token, &keys.decoding, &Validation::default())
            .map_err(|_| TokenError::Invalid)?;

        data.claims.sub.parse().map_err(|_| TokenError::Invalid)
    }
}
