// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Authentication seam.
//!
//! Token issuance (magic links, JWTs, invite codes) is external; the node
//! only needs `validate(token) → user_id`.  [`StaticTokenValidator`] backs
//! development deployments and tests with a fixed token table from config.

use std::collections::HashMap;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::error::GatewayError;

/// Opaque capability: turn a bearer token into a user id.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<String, GatewayError>;
}

/// Fixed token → user-id table (the `server.dev_tokens` config section).
pub struct StaticTokenValidator {
    tokens: HashMap<String, String>,
}

impl StaticTokenValidator {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Result<String, GatewayError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| GatewayError::Auth("invalid token".to_string()))
    }
}

/// Extract and validate the bearer token from request headers.
pub fn authenticate(
    validator: &dyn TokenValidator,
    headers: &HeaderMap,
) -> Result<String, GatewayError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::Auth("missing authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| GatewayError::Auth("expected bearer token".to_string()))?;
    validator.validate(token)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn validator() -> StaticTokenValidator {
        let mut tokens = HashMap::new();
        tokens.insert(
            "secret-token".to_string(),
            "6a1f0a4e-9d0e-4bbb-a8a1-1d20f2a0c9ee".to_string(),
        );
        StaticTokenValidator::new(tokens)
    }

    #[test]
    fn valid_token_resolves_user() {
        let user = validator().validate("secret-token").unwrap();
        assert_eq!(user, "6a1f0a4e-9d0e-4bbb-a8a1-1d20f2a0c9ee");
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert!(validator().validate("nope").is_err());
    }

    #[test]
    fn authenticate_requires_bearer_scheme() {
        let v = validator();
        let mut headers = HeaderMap::new();
        assert!(authenticate(&v, &headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(authenticate(&v, &headers).is_err());

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer secret-token"),
        );
        assert!(authenticate(&v, &headers).is_ok());
    }
}
