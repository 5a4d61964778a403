pub mod password;

pub use password::{PasswordHasher, Sha256Hasher};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            username: username.into(),
            is_admin,
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Sign `claims` with the configured secret.
pub fn create_token(claims: &Claims) -> Result<String, JwtError> {
    encode_with(claims, &config::config().security.jwt_secret)
}

/// Verify signature and expiry with the configured secret.
pub fn decode_token(token: &str) -> Result<Claims, JwtError> {
    decode_with(token, &config::config().security.jwt_secret)
}

pub fn encode_with(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_with(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_claims() {
        let claims = Claims::new("admin", true);
        let token = encode_with(&claims, "test-secret").unwrap();
        assert_eq!(decode_with(&token, "test-secret").unwrap(), claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode_with(&Claims::new("u1", false), "one").unwrap();
        assert!(matches!(decode_with(&token, "two"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::new("u1", false);
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 3600;
        let token = encode_with(&claims, "s").unwrap();
        assert!(decode_with(&token, "s").is_err());
    }

    #[test]
    fn empty_secret_never_signs() {
        assert!(matches!(encode_with(&Claims::new("u1", false), ""), Err(JwtError::InvalidSecret)));
    }
}
