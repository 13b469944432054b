// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission scopes for authorization.
//!
//! A scope is a plain string such as `get:drinks-detail` granted through the
//! token's `permissions` claim. Matching is exact: no wildcards, no hierarchy.

use super::{AuthError, VerifiedClaims};

/// A permission scope known at compile time.
///
/// Implemented by marker types so a handler's required scope is part of its
/// signature, e.g. `Authorized<PostDrinks>`.
pub trait Scope: Send + Sync + 'static {
    /// The exact string that must appear in the `permissions` claim.
    const NAME: &'static str;
}

/// Check that `claims` grant `required`.
pub fn enforce(required: &str, claims: &VerifiedClaims) -> Result<(), AuthError> {
    if !claims.has_permissions_claim() {
        return Err(AuthError::PermissionsClaimMissing);
    }
    if claims.has_permission(required) {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied(required.to_string()))
    }
}
