// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Caching
//!
//! - The key set lives in an immutable [`KeySnapshot`] behind an `ArcSwap`;
//!   readers never take a lock
//! - A token whose `kid` is not in the snapshot triggers exactly one refetch
//!   before the key is reported missing (key rotation)
//! - Snapshots older than the TTL are refreshed on the next lookup; if that
//!   refresh fails a key still present in the stale snapshot is served
//! - Refreshes are serialized and every attempt is recorded, so concurrent
//!   misses share a single fetch and its outcome, success or failure
//! - Waiting for another task's refresh is bounded by the fetch timeout
//! - A key set without usable keys never replaces the current snapshot

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of the public keys tokens are verified against.
///
/// Injected into the verifier as `Arc<dyn KeyDirectory>`.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Resolve the verification key for `kid`.
    async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError>;

    /// Whether keys can currently be served (used by readiness probes).
    async fn is_available(&self) -> bool;
}

/// A verification key taken from the key set.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    key: DecodingKey,
}

impl SigningKey {
    /// Build an RS256 key from base64url-encoded modulus and exponent.
    pub fn from_rsa_components(kid: impl Into<String>, n: &str, e: &str) -> Result<Self, AuthError> {
        let kid = kid.into();
        let key = DecodingKey::from_rsa_components(n, e).map_err(|err| {
            AuthError::KeyDirectoryUnavailable(format!("invalid RSA components for '{kid}': {err}"))
        })?;
        Ok(Self {
            kid,
            algorithm: Algorithm::RS256,
            key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// One entry of the published key set.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyDescriptor {
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

/// Body of the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct KeySet {
    pub keys: Vec<KeyDescriptor>,
}

impl KeyDescriptor {
    /// Convert to a signing key, or `None` if this entry cannot verify RS256 tokens.
    fn to_signing_key(&self) -> Option<SigningKey> {
        let kid = self.kid.as_deref()?;
        if self.kty != "RSA" {
            debug!(kid, kty = %self.kty, "Skipping non-RSA key");
            return None;
        }
        if self.key_use.as_deref().is_some_and(|u| u != "sig") {
            debug!(kid, "Skipping key not meant for signatures");
            return None;
        }
        if self.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            debug!(kid, alg = ?self.alg, "Skipping key with unsupported alg");
            return None;
        }
        let (n, e) = (self.n.as_deref()?, self.e.as_deref()?);

        match SigningKey::from_rsa_components(kid, n, e) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(kid, error = %err, "Skipping unusable JWKS entry");
                None
            }
        }
    }
}

/// Immutable view of the key set at one point in time.
#[derive(Debug, Default)]
struct KeySnapshot {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: Option<Instant>,
}

impl KeySnapshot {
    fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < ttl)
    }
}

/// JWKS manager with caching.
///
/// Fetches and caches the identity provider's key set for token verification.
pub struct JwksManager {
    /// JWKS URL
    jwks_url: Url,
    /// Cache TTL
    cache_ttl: Duration,
    /// Bound on one fetch and on waiting for another task's fetch
    fetch_timeout: Duration,
    /// Current key set
    snapshot: ArcSwap<KeySnapshot>,
    /// Completed fetch attempts; only bumped while `last_failure` is held
    attempts: AtomicU64,
    /// Serializes refreshes and holds the error of the latest attempt
    last_failure: Mutex<Option<AuthError>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g., `https://tenant.us.auth0.com/.well-known/jwks.json`)
    /// - `fetch_timeout`: Upper bound for a single fetch, connect included
    pub fn new(jwks_url: Url, fetch_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self {
            jwks_url,
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout,
            snapshot: ArcSwap::from_pointee(KeySnapshot::default()),
            attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Check if the key set is currently cached and within its TTL.
    pub fn is_cached(&self) -> bool {
        self.snapshot.load().is_fresh(self.cache_ttl)
    }

    /// Number of usable keys in the current snapshot.
    pub fn key_count(&self) -> usize {
        self.snapshot.load().keys.len()
    }

    /// Refresh the key set. Returns the number of usable keys.
    ///
    /// Joins an attempt already in flight instead of starting another one.
    pub async fn refresh(&self) -> Result<usize, AuthError> {
        let seen = self.attempts.load(Ordering::Acquire);
        Ok(self.refresh_after(seen).await?.keys.len())
    }

    /// Fetch unless an attempt completed after `seen` was read, in which case
    /// that attempt's outcome is returned.
    async fn refresh_after(&self, seen: u64) -> Result<Arc<KeySnapshot>, AuthError> {
        let mut last_failure = tokio::time::timeout(self.fetch_timeout, self.last_failure.lock())
            .await
            .map_err(|_| {
                AuthError::KeyDirectoryUnavailable("timed out waiting for JWKS refresh".into())
            })?;

        if self.attempts.load(Ordering::Acquire) != seen {
            return match last_failure.as_ref() {
                Some(err) => Err(err.clone()),
                None => Ok(self.snapshot.load_full()),
            };
        }

        let outcome = self.fetch_and_store().await;
        *last_failure = outcome.as_ref().err().cloned();
        self.attempts.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn fetch_and_store(&self) -> Result<Arc<KeySnapshot>, AuthError> {
        let keys = self.fetch_jwks().await?;
        let snapshot = Arc::new(KeySnapshot {
            keys,
            fetched_at: Some(Instant::now()),
        });
        self.snapshot.store(Arc::clone(&snapshot));

        info!(
            jwks_url = %self.jwks_url,
            keys_count = snapshot.keys.len(),
            "JWKS refreshed"
        );
        Ok(snapshot)
    }

    /// Fetch the key set from the endpoint.
    async fn fetch_jwks(&self) -> Result<HashMap<String, Arc<SigningKey>>, AuthError> {
        let response = self
            .client
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| AuthError::KeyDirectoryUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyDirectoryUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: KeySet = response
            .json()
            .await
            .map_err(|e| AuthError::KeyDirectoryUnavailable(e.to_string()))?;

        let keys: HashMap<_, _> = jwks
            .keys
            .iter()
            .filter_map(KeyDescriptor::to_signing_key)
            .map(|key| (key.kid.clone(), Arc::new(key)))
            .collect();
        if keys.is_empty() {
            return Err(AuthError::KeyDirectoryUnavailable(
                "JWKS contains no usable signing keys".into(),
            ));
        }
        Ok(keys)
    }
}

#[async_trait]
impl KeyDirectory for JwksManager {
    async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError> {
        let seen = self.attempts.load(Ordering::Acquire);
        let snapshot = self.snapshot.load_full();
        let cached = snapshot.get(kid);
        if let Some(key) = &cached {
            if snapshot.is_fresh(self.cache_ttl) {
                return Ok(Arc::clone(key));
            }
        }

        match self.refresh_after(seen).await {
            Ok(current) => current
                .get(kid)
                .ok_or_else(|| AuthError::SigningKeyNotFound(kid.to_string())),
            Err(err) => match cached {
                Some(key) => {
                    warn!(kid, error = %err, "JWKS refresh failed, serving stale key");
                    Ok(key)
                }
                None => Err(err),
            },
        }
    }

    async fn is_available(&self) -> bool {
        if self.is_cached() {
            return true;
        }
        match self.refresh().await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "JWKS unavailable");
                false
            }
        }
    }
}

impl std::fmt::Debug for JwksManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksManager")
            .field("jwks_url", &self.jwks_url.as_str())
            .field("cache_ttl", &self.cache_ttl)
            .field("keys_count", &self.key_count())
            .finish_non_exhaustive()
    }
}

/// Background task that keeps the key set warm.
pub struct JwksRefresher {
    manager: Arc<JwksManager>,
    interval: Duration,
}

impl JwksRefresher {
    pub fn new(manager: Arc<JwksManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "JWKS refresher starting"
        );

        loop {
            if let Err(e) = self.manager.refresh().await {
                warn!(error = %e, "Background JWKS refresh failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("JWKS refresher shutting down");
                    return;
                }
            }
        }
    }
}
