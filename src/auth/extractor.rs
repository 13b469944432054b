// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for scope-gated handlers.
//!
//! Put `Authorized<S>` first in a handler's arguments to require scope `S`:
//!
//! ```rust,ignore
//! async fn delete_drink(auth: Authorized<DeleteDrinks>, ...) -> impl IntoResponse {
//!     // auth.claims() carries "delete:drinks"
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderValue},
};

use super::permissions::Scope;
use super::{AuthError, Authorizer, VerifiedClaims};

/// Pull the token out of an `Authorization: Bearer <token>` header value.
///
/// The scheme must be exactly `Bearer` and the value exactly two
/// space-separated parts.
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = header
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Verified claims of a request authorized for scope `S`.
///
/// Rejects with [`AuthError`] before the handler body runs.
pub struct Authorized<S> {
    claims: VerifiedClaims,
    scope: PhantomData<fn() -> S>,
}

impl<S: Scope> Authorized<S> {
    /// The scope this request was authorized for.
    pub fn scope(&self) -> &'static str {
        S::NAME
    }

    pub fn claims(&self) -> &VerifiedClaims {
        &self.claims
    }
}

impl<S, St> FromRequestParts<St> for Authorized<S>
where
    S: Scope,
    Arc<Authorizer>: FromRef<St>,
    St: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        let authorizer = Arc::<Authorizer>::from_ref(state);
        let claims = authorizer.authorize(&parts.headers, S::NAME).await?;

        Ok(Authorized {
            claims,
            scope: PhantomData,
        })
    }
}
