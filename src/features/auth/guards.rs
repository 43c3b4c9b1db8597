//! Shared-secret guard for privileged operations.
//!
//! Status updates, department management and category mappings are gated by
//! an `X-API-Key` header compared against the configured secret. The secret
//! reaches handlers through an [`AdminApiKey`] request extension installed
//! once on the application router.

use crate::core::error::AppError;
use crate::shared::constants::API_KEY_HEADER;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// The configured admin secret
#[derive(Clone)]
pub struct AdminApiKey(Arc<str>);

impl AdminApiKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for AdminApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminApiKey(***)")
    }
}

/// Guard that admits requests presenting the admin API key.
///
/// A missing header is 401; a present but wrong key is 403.
///
/// # Example
/// ```ignore
/// pub async fn handler(_: RequireApiKey) { ... }
/// ```
pub struct RequireApiKey;

impl<S> FromRequestParts<S> for RequireApiKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let expected = parts.extensions.get::<AdminApiKey>().ok_or_else(|| {
            tracing::error!("AdminApiKey extension missing from router");
            AppError::Internal("API key guard is not configured".to_string())
        })?;

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing API key".to_string()))?
            .to_str()
            .map_err(|_| AppError::Forbidden("Invalid API key".to_string()))?;

        if !expected.matches(provided) {
            tracing::warn!("Rejected request with invalid API key");
            return Err(AppError::Forbidden("Invalid API key".to_string()));
        }

        Ok(RequireApiKey)
    }
}
