// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authorization gate: extract, verify, enforce, then run the operation.

use std::future::Future;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::{debug, info, warn};

use super::extractor::bearer_token;
use super::permissions::enforce;
use super::verifier::TokenVerifier;
use super::{AuthError, VerifiedClaims};

/// Runs the full authorization sequence for one request.
///
/// Holds no per-request state; the only shared state is the key set inside
/// the verifier's key directory.
#[derive(Clone)]
pub struct Authorizer {
    verifier: TokenVerifier,
}

impl Authorizer {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Authorize a request for `scope` and return its verified claims.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        scope: &str,
    ) -> Result<VerifiedClaims, AuthError> {
        match self.check(headers, scope).await {
            Ok(claims) => {
                debug!(subject = %claims.subject, scope, "request authorized");
                Ok(claims)
            }
            Err(err @ AuthError::KeyDirectoryUnavailable(_)) => {
                warn!(scope, code = err.code(), error = %err, "authorization failed");
                Err(err)
            }
            Err(err) => {
                info!(scope, code = err.code(), error = %err, "request rejected");
                Err(err)
            }
        }
    }

    /// Run `operation` only if the request is authorized for `scope`.
    ///
    /// On failure the operation is never invoked and the error is returned
    /// as produced.
    pub async fn guard<F, Fut, T>(
        &self,
        headers: &HeaderMap,
        scope: &str,
        operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(VerifiedClaims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(headers, scope).await?;
        Ok(operation(claims).await)
    }

    async fn check(&self, headers: &HeaderMap, scope: &str) -> Result<VerifiedClaims, AuthError> {
        let token = bearer_token(headers.get(AUTHORIZATION))?;
        let claims = self.verifier.verify(token).await?;
        enforce(scope, &claims)?;
        Ok(claims)
    }
}
