//! Bearer token issuing and verification (HS256 JWT)

use crate::config::AuthConfig;
use crate::models::User;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the token owner
    pub sub: String,
    pub email: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token creation error: {0}")]
    TokenCreationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token verification error: {0}")]
    TokenVerificationError(String),
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expire_minutes: i64,
}

impl JwtService {
    pub fn new(secret: &str, expire_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expire_minutes,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.secret_key, config.access_token_expire_minutes)
    }

    /// Token lifetime in minutes
    pub fn expire_minutes(&self) -> i64 {
        self.expire_minutes
    }

    /// Create an access token for a user
    pub fn create_token(&self, user: &User) -> Result<String, JwtError> {
        let now = Utc::now();
        let exp = Duration::try_minutes(self.expire_minutes)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                JwtError::TokenCreationError(format!(
                    "token lifetime of {} minutes is out of range",
                    self.expire_minutes
                ))
            })?;
        let claims = Claims {
            sub: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenCreationError(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::TokenVerificationError(e.to_string()),
            })
    }
}
