// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Identity provider domain, e.g. `coffee.eu.auth0.com` | Required |
//! | `API_AUDIENCE` | Expected JWT audience claim | Required |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | `https://{AUTH0_DOMAIN}/` |
//! | `JWKS_URL` | JWKS endpoint for signature verification | `https://{AUTH0_DOMAIN}/.well-known/jwks.json` |
//! | `JWKS_CACHE_TTL_SECS` | How long a fetched key set is trusted | `300` |
//! | `JWKS_FETCH_TIMEOUT_SECS` | Timeout for one JWKS fetch | `5` |
//! | `JWKS_REFRESH_INTERVAL_SECS` | Background key refresh interval | Disabled |
//! | `JWT_LEEWAY_SECS` | Clock skew tolerance on `exp` | `0` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `TLS_CERT_PATH` | PEM certificate chain, enables HTTPS | Unset |
//! | `TLS_KEY_PATH` | PEM private key, required with `TLS_CERT_PATH` | Unset |
//! | `SEED_SAMPLE_DRINK` | Seed the store with the "water" drink | `true` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::auth::jwks::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT};

pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const API_AUDIENCE_ENV: &str = "API_AUDIENCE";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const JWKS_URL_ENV: &str = "JWKS_URL";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECS";
pub const JWKS_REFRESH_INTERVAL_ENV: &str = "JWKS_REFRESH_INTERVAL_SECS";
pub const JWT_LEEWAY_ENV: &str = "JWT_LEEWAY_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const SEED_SAMPLE_DRINK_ENV: &str = "SEED_SAMPLE_DRINK";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Certificate and key paths for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub domain: String,
    pub audience: String,
    pub issuer: String,
    pub jwks_url: Url,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub refresh_interval: Option<Duration>,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub bind_addr: SocketAddr,
    pub tls: Option<TlsPaths>,
    pub seed_sample_drink: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let domain = get(AUTH0_DOMAIN_ENV).ok_or(ConfigError::Missing(AUTH0_DOMAIN_ENV))?;
        if domain.contains("://") || domain.contains('/') {
            return Err(ConfigError::invalid(
                AUTH0_DOMAIN_ENV,
                "expected a bare host name",
            ));
        }
        let audience = get(API_AUDIENCE_ENV).ok_or(ConfigError::Missing(API_AUDIENCE_ENV))?;
        let issuer = get(AUTH_ISSUER_ENV).unwrap_or_else(|| format!("https://{domain}/"));

        let jwks_url = get(JWKS_URL_ENV)
            .unwrap_or_else(|| format!("https://{domain}/.well-known/jwks.json"));
        let jwks_url = Url::parse(&jwks_url).map_err(|e| ConfigError::invalid(JWKS_URL_ENV, e))?;
        if !matches!(jwks_url.scheme(), "https" | "http") {
            return Err(ConfigError::invalid(JWKS_URL_ENV, "expected an http(s) URL"));
        }

        let cache_ttl = parse_secs(&get, JWKS_CACHE_TTL_ENV)?.unwrap_or(DEFAULT_CACHE_TTL);
        let fetch_timeout =
            parse_secs(&get, JWKS_FETCH_TIMEOUT_ENV)?.unwrap_or(DEFAULT_FETCH_TIMEOUT);
        let refresh_interval =
            parse_secs(&get, JWKS_REFRESH_INTERVAL_ENV)?.filter(|interval| !interval.is_zero());
        let leeway_secs = parse_number::<u64>(&get, JWT_LEEWAY_ENV)?.unwrap_or(0);

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.parse().map_err(|e| ConfigError::invalid(HOST_ENV, e))?;
        let port = parse_number::<u16>(&get, PORT_ENV)?.unwrap_or(DEFAULT_PORT);

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let seed_sample_drink = match get(SEED_SAMPLE_DRINK_ENV) {
            None => true,
            Some(value) => parse_bool(&value)
                .ok_or_else(|| ConfigError::invalid(SEED_SAMPLE_DRINK_ENV, "expected true or false"))?,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::invalid(
                    LOG_FORMAT_ENV,
                    format!("unknown format '{other}'"),
                ))
            }
        };

        Ok(Self {
            auth: AuthConfig {
                domain,
                audience,
                issuer,
                jwks_url,
                cache_ttl,
                fetch_timeout,
                refresh_interval,
                leeway_secs,
            },
            bind_addr: SocketAddr::new(ip, port),
            tls,
            seed_sample_drink,
            log_format,
        })
    }
}

fn parse_number<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(name)
        .map(|value| value.parse::<T>().map_err(|e| ConfigError::invalid(name, e)))
        .transpose()
}

fn parse_secs(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_number::<u64>(get, name)?.map(Duration::from_secs))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
