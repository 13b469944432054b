// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! Bearer token authorization against an external identity provider (Auth0).
//!
//! ## Flow
//!
//! 1. Client obtains an access token from the identity provider
//! 2. Client sends `Authorization: Bearer <JWT>`
//! 3. Server, for every protected route:
//!    - extracts the token from the header ([`bearer_token`])
//!    - verifies RS256 signature, expiry, issuer and audience against the
//!      provider's JWKS ([`TokenVerifier`], [`JwksManager`])
//!    - checks the route's permission scope ([`enforce`])
//!    - hands the [`VerifiedClaims`] to the handler ([`Authorized`])
//!
//! ## Security
//!
//! - Only RS256 is accepted; `none` and HMAC algorithms are refused before
//!   any key is looked up
//! - Unknown key ids trigger a single JWKS refetch (key rotation)
//! - Error responses carry a stable code and a fixed description, never the
//!   underlying cause

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod jwks;
pub mod permissions;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

pub use claims::VerifiedClaims;
pub use error::AuthError;
pub use extractor::{bearer_token, Authorized};
pub use gate::Authorizer;
pub use jwks::{JwksManager, JwksRefresher, KeyDirectory, SigningKey};
pub use permissions::{enforce, Scope};
pub use verifier::{TokenPolicy, TokenVerifier};
