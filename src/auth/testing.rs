// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test helpers: RSA key material, token minting and an in-memory key directory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

use super::jwks::{KeyDirectory, SigningKey};
use super::verifier::{TokenPolicy, TokenVerifier};
use super::{AuthError, Authorizer};

pub const ISSUER: &str = "https://coffee-shop.eu.auth0.com/";
pub const AUDIENCE: &str = "coffee";

pub struct TestKey {
    pub kid: String,
    pub modulus: String,
    pub exponent: String,
    encoding: EncodingKey,
}

impl TestKey {
    fn generate(kid: &str) -> Self {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();
        let pem = private_key.to_pkcs1_pem(LineEnding::LF).expect("private pem");

        Self {
            kid: kid.to_string(),
            modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            encoding: EncodingKey::from_rsa_pem(pem.as_bytes()).expect("encoding key"),
        }
    }

    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_rsa_components(&self.kid, &self.modulus, &self.exponent)
            .expect("valid components")
    }

    /// RS256-sign `claims` with this key's `kid` in the header.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding).expect("sign token")
    }
}

// Key generation is slow; share two keys per test binary.
static PRIMARY: LazyLock<TestKey> = LazyLock::new(|| TestKey::generate("primary-2026"));
static SECONDARY: LazyLock<TestKey> = LazyLock::new(|| TestKey::generate("secondary-2026"));

pub fn primary_key() -> &'static TestKey {
    &PRIMARY
}

pub fn secondary_key() -> &'static TestKey {
    &SECONDARY
}

/// JWKS document publishing `keys`.
pub fn jwks_body(keys: &[&TestKey]) -> Value {
    let keys: Vec<Value> = keys
        .iter()
        .map(|key| {
            json!({
                "kid": key.kid,
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "n": key.modulus,
                "e": key.exponent,
            })
        })
        .collect();
    json!({ "keys": keys })
}

/// Claims accepted by [`policy`], valid for ten minutes.
pub fn claims_with(permissions: &[&str]) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": ISSUER,
        "sub": "auth0|barista",
        "aud": [AUDIENCE, format!("{ISSUER}userinfo")],
        "iat": now,
        "exp": now + 600,
        "permissions": permissions,
    })
}

/// Token signed by the primary key carrying `permissions`.
pub fn token_with(permissions: &[&str]) -> String {
    primary_key().sign(&claims_with(permissions))
}

/// Assemble a token from arbitrary header and payload JSON with a junk signature.
pub fn forge_token(header: &Value, payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(payload.to_string()),
        URL_SAFE_NO_PAD.encode(b"not-a-signature"),
    )
}

pub fn policy() -> TokenPolicy {
    TokenPolicy::new(ISSUER, AUDIENCE)
}

/// Key directory serving a fixed set of keys and counting lookups.
#[derive(Default)]
pub struct StaticKeyDirectory {
    keys: HashMap<String, Arc<SigningKey>>,
    lookups: AtomicUsize,
}

impl StaticKeyDirectory {
    pub fn with_keys(keys: &[&TestKey]) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|key| (key.kid.clone(), Arc::new(key.signing_key())))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyDirectory for StaticKeyDirectory {
    async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::SigningKeyNotFound(kid.to_string()))
    }

    async fn is_available(&self) -> bool {
        !self.keys.is_empty()
    }
}

/// Authorizer trusting only the primary key.
pub fn authorizer() -> Authorizer {
    let directory = Arc::new(StaticKeyDirectory::with_keys(&[primary_key()]));
    Authorizer::new(TokenVerifier::new(directory, policy()))
}
