// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization errors.
//!
//! Every failure on the way from the `Authorization` header to a protected
//! handler ends up as one of these variants. The `Display` text may carry
//! internal detail and is meant for logs; the response body only ever
//! contains [`AuthError::code`] and [`AuthError::description`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authorization error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("authorization header is missing")]
    MissingHeader,

    /// Header present but not `Bearer <token>`
    #[error("authorization header is malformed")]
    MalformedHeader,

    /// Token is not three segments or its header is unusable
    #[error("token format is invalid: {0}")]
    InvalidTokenFormat(&'static str),

    /// Header declares an algorithm other than RS256
    #[error("token algorithm '{0}' is not supported")]
    UnsupportedAlgorithm(String),

    /// Key id not present in the key set even after a refetch
    #[error("no signing key with kid '{0}'")]
    SigningKeyNotFound(String),

    /// Key set could not be fetched
    #[error("key directory unavailable: {0}")]
    KeyDirectoryUnavailable(String),

    /// Signature does not verify against the resolved key
    #[error("token signature is invalid")]
    InvalidSignature,

    /// `exp` is at or before the current time
    #[error("token has expired")]
    TokenExpired,

    /// Issuer, audience or a required claim is wrong or missing
    #[error("token claims are invalid: {0}")]
    InvalidClaims(&'static str),

    /// Token carries no `permissions` claim at all
    #[error("token has no permissions claim")]
    PermissionsClaimMissing,

    /// Token lacks the required scope
    #[error("permission '{0}' not granted")]
    PermissionDenied(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    error: &'static str,
    message: &'static str,
}

impl AuthError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::InvalidTokenFormat(_) => "invalid_token_format",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::SigningKeyNotFound(_) => "signing_key_not_found",
            AuthError::KeyDirectoryUnavailable(_) => "key_directory_unavailable",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims(_) => "invalid_claims",
            AuthError::PermissionsClaimMissing => "permissions_claim_missing",
            AuthError::PermissionDenied(_) => "permission_denied",
        }
    }

    /// Human-readable description safe to return to an unauthenticated caller.
    pub fn description(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "Authorization header is expected.",
            AuthError::MalformedHeader => "Authorization header must be of the form 'Bearer <token>'.",
            AuthError::InvalidTokenFormat(_) => "Token is not a well-formed JWT.",
            AuthError::UnsupportedAlgorithm(_) => "Token signing algorithm is not accepted.",
            AuthError::SigningKeyNotFound(_) => "Unable to find the key the token was signed with.",
            AuthError::KeyDirectoryUnavailable(_) => "Unable to verify the token at this time.",
            AuthError::InvalidSignature => "Token signature is invalid.",
            AuthError::TokenExpired => "Token expired.",
            AuthError::InvalidClaims(_) => "Incorrect claims. Please check the audience and issuer.",
            AuthError::PermissionsClaimMissing => "Permissions not included in token.",
            AuthError::PermissionDenied(_) => "Permission not found.",
        }
    }

    /// HTTP status code for this error.
    ///
    /// Only a missing scope is an authorization (403) failure; everything
    /// else, key directory outages included, is reported as 401.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            success: false,
            error: self.code(),
            message: self.description(),
        });
        (self.status_code(), body).into_response()
    }
}
