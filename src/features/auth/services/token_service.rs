use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};

/// JWT claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User email
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a token was rejected
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthorized("Token has expired".to_string()),
            TokenError::Invalid => {
                AppError::Unauthorized("Could not validate credentials".to_string())
            }
        }
    }
}

/// Issues and verifies HS256 access tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl)
    }

    /// Token lifetime in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.as_secs() as i64
    }

    /// Issue a token for `email` valid from now for the configured lifetime
    pub fn issue(&self, email: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        self.issue_with_times(email, now, now + self.ttl_secs())
    }

    fn issue_with_times(&self, email: &str, iat: i64, exp: i64) -> Result<String> {
        let claims = Claims {
            sub: email.to_string(),
            iat,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign access token: {}", e);
            AppError::Internal("Failed to issue access token".to_string())
        })
    }

    /// Decode and verify a token's signature and expiry
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    tracing::debug!("Token verification failed: {}", e);
                    TokenError::Invalid
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "an-hs256-secret-that-is-long-enough-for-tests";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::from_secs(30 * 60))
    }

    #[test]
    fn test_issue_then_verify_returns_subject() {
        let svc = service();
        let token = svc.issue("citizen@example.com").unwrap();

        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "citizen@example.com");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let token = svc
            .issue_with_times("citizen@example.com", now - 7200, now - 3600)
            .unwrap();

        assert_eq!(svc.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let svc = service();
        let token = svc.issue("citizen@example.com").unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let sig = parts[2].clone();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        parts[2] = format!("{}{}", flipped, &sig[1..]);
        let tampered = parts.join(".");

        assert_eq!(svc.verify(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = TokenService::new(
            "a-completely-different-secret-of-sufficient-size",
            Duration::from_secs(60),
        );
        let token = other.issue("citizen@example.com").unwrap();

        assert_eq!(service().verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(service().verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(service().verify(""), Err(TokenError::Invalid));
    }
}
