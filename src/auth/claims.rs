// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the verified claim set handed to protected handlers.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Claims as they appear in the token payload.
///
/// Everything is optional at this level so a garbled payload maps to
/// [`AuthError::InvalidClaims`] instead of a generic decode failure.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    /// Auth0 RBAC permissions
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }

    fn into_vec(self) -> Vec<String> {
        match self {
            Audience::Single(aud) => vec![aud],
            Audience::Many(auds) => auds,
        }
    }
}

/// Signature-checked claims of the current request's token.
///
/// Built fresh by the verifier for every request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedClaims {
    /// Subject (user id at the identity provider)
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    /// `None` when the token had no `permissions` claim at all
    permissions: Option<BTreeSet<String>>,
}

impl VerifiedClaims {
    /// Granted permission scopes; empty when the claim was absent.
    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().flatten().map(String::as_str)
    }

    /// Whether the token carried a `permissions` claim.
    pub fn has_permissions_claim(&self) -> bool {
        self.permissions.is_some()
    }

    /// Exact-match scope check.
    pub fn has_permission(&self, scope: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|granted| granted.contains(scope))
    }
}

impl TryFrom<TokenClaims> for VerifiedClaims {
    type Error = AuthError;

    fn try_from(claims: TokenClaims) -> Result<Self, Self::Error> {
        let exp = claims.exp.ok_or(AuthError::InvalidClaims("exp"))?;
        let expires_at = timestamp(exp).ok_or(AuthError::InvalidClaims("exp"))?;
        let issued_at = match claims.iat {
            Some(iat) => Some(timestamp(iat).ok_or(AuthError::InvalidClaims("iat"))?),
            None => None,
        };

        Ok(Self {
            subject: claims.sub.ok_or(AuthError::InvalidClaims("sub"))?,
            issuer: claims.iss.ok_or(AuthError::InvalidClaims("iss"))?,
            audience: claims
                .aud
                .map(Audience::into_vec)
                .ok_or(AuthError::InvalidClaims("aud"))?,
            expires_at,
            issued_at,
            permissions: claims
                .permissions
                .map(|scopes| scopes.into_iter().collect()),
        })
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            iss: Some("https://coffee.eu.auth0.com/".to_string()),
            sub: Some("auth0|barista".to_string()),
            aud: Some(Audience::Many(vec![
                "coffee".to_string(),
                "https://coffee.eu.auth0.com/userinfo".to_string(),
            ])),
            exp: Some(1_700_003_600),
            iat: Some(1_700_000_000),
            permissions: Some(vec!["get:drinks-detail".to_string(), "post:drinks".to_string()]),
        }
    }

    #[test]
    fn converts_token_claims() {
        let claims = VerifiedClaims::try_from(sample_claims()).unwrap();
        assert_eq!(claims.subject, "auth0|barista");
        assert_eq!(claims.audience.len(), 2);
        assert_eq!(claims.expires_at.timestamp(), 1_700_003_600);
        assert_eq!(claims.issued_at.map(|t| t.timestamp()), Some(1_700_000_000));
        assert!(claims.has_permission("post:drinks"));
        assert!(!claims.has_permission("post:drinks "));
    }

    #[test]
    fn absent_permissions_read_as_empty_but_stay_observable() {
        let mut raw = sample_claims();
        raw.permissions = None;
        let claims = VerifiedClaims::try_from(raw).unwrap();
        assert_eq!(claims.permissions().count(), 0);
        assert!(!claims.has_permissions_claim());

        let mut raw = sample_claims();
        raw.permissions = Some(Vec::new());
        let claims = VerifiedClaims::try_from(raw).unwrap();
        assert!(claims.has_permissions_claim());
    }

    #[test]
    fn missing_subject_is_invalid() {
        let mut raw = sample_claims();
        raw.sub = None;
        assert_eq!(
            VerifiedClaims::try_from(raw),
            Err(AuthError::InvalidClaims("sub"))
        );
    }

    #[test]
    fn audience_accepts_string_or_array() {
        let single: Audience = serde_json::from_str(r#""coffee""#).unwrap();
        assert!(single.contains("coffee"));
        let many: Audience = serde_json::from_str(r#"["a","coffee"]"#).unwrap();
        assert!(many.contains("coffee"));
        assert!(!many.contains("coffe"));
    }
}
