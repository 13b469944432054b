// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! Order of checks, each failing with its own [`AuthError`]:
//!
//! 1. token shape and header (`alg`, `kid`)
//! 2. algorithm pinned to RS256, before any key is looked up
//! 3. key resolution through the [`KeyDirectory`]
//! 4. RS256 signature
//! 5. expiry, then issuer and audience

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, Validation};
use serde::Deserialize;
use tracing::debug;

use super::claims::TokenClaims;
use super::jwks::KeyDirectory;
use super::{AuthError, VerifiedClaims};

/// The only accepted signing algorithm.
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Expected issuer and audience plus clock tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Expected `iss`, compared exactly
    pub issuer: String,
    /// Expected `aud` entry, compared exactly
    pub audience: String,
    /// Seconds added to `exp` before a token counts as expired
    pub leeway: u64,
}

impl TokenPolicy {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway: 0,
        }
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    kid: Option<String>,
}

/// Verifies RS256 tokens against keys from a [`KeyDirectory`].
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<dyn KeyDirectory>,
    policy: TokenPolicy,
}

impl TokenVerifier {
    pub fn new(keys: Arc<dyn KeyDirectory>, policy: TokenPolicy) -> Self {
        Self { keys, policy }
    }

    pub fn key_directory(&self) -> &Arc<dyn KeyDirectory> {
        &self.keys
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let kid = key_id(token)?;
        let key = self.keys.resolve(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        // Expiry, issuer and audience are checked below with exact semantics.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<serde_json::Value>(token, key.decoding_key(), &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => {
                    AuthError::UnsupportedAlgorithm(SUPPORTED_ALGORITHM.to_string())
                }
                _ => {
                    debug!(kid = %kid, error = %err, "token rejected by decoder");
                    AuthError::InvalidTokenFormat("undecodable payload or signature")
                }
            })?;

        let claims: TokenClaims = serde_json::from_value(data.claims)
            .map_err(|_| AuthError::InvalidClaims("payload"))?;

        let exp = claims.exp.ok_or(AuthError::InvalidClaims("exp"))?;
        let leeway = i64::try_from(self.policy.leeway).unwrap_or(i64::MAX);
        if Utc::now().timestamp() >= exp.saturating_add(leeway) {
            return Err(AuthError::TokenExpired);
        }

        if claims.iss.as_deref() != Some(self.policy.issuer.as_str()) {
            return Err(AuthError::InvalidClaims("iss"));
        }
        if !claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains(&self.policy.audience))
        {
            return Err(AuthError::InvalidClaims("aud"));
        }

        VerifiedClaims::try_from(claims)
    }
}

/// Check token shape and header, returning the `kid`.
fn key_id(token: &str) -> Result<String, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(AuthError::InvalidTokenFormat("expected three segments"));
    }

    let header_bytes = Base64UrlUnpadded::decode_vec(segments[0])
        .map_err(|_| AuthError::InvalidTokenFormat("header is not base64url"))?;
    let header: TokenHeader = serde_json::from_slice(&header_bytes)
        .map_err(|_| AuthError::InvalidTokenFormat("header is not a JSON object"))?;

    let alg = header
        .alg
        .ok_or(AuthError::InvalidTokenFormat("header has no alg"))?;
    if alg != SUPPORTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(alg));
    }

    header
        .kid
        .ok_or(AuthError::InvalidTokenFormat("header has no kid"))
}
