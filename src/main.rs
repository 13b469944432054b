// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coffee_shop_api::{
    api::router,
    auth::{Authorizer, JwksManager, JwksRefresher, TokenPolicy, TokenVerifier},
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    error::ServerError,
    state::AppState,
    store::DrinkStore,
};

/// Time given to in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let auth = &config.auth;
    let jwks = Arc::new(
        JwksManager::new(auth.jwks_url.clone(), auth.fetch_timeout)?.with_cache_ttl(auth.cache_ttl),
    );

    // Warm the cache; a failure here is retried on the first request.
    match jwks.refresh().await {
        Ok(count) => info!(keys = count, url = %auth.jwks_url, "signing keys loaded"),
        Err(err) => warn!(error = %err, url = %auth.jwks_url, "initial JWKS fetch failed"),
    }

    let shutdown = CancellationToken::new();
    if let Some(interval) = auth.refresh_interval {
        let refresher = JwksRefresher::new(Arc::clone(&jwks), interval);
        tokio::spawn(refresher.run(shutdown.clone()));
    }

    let policy = TokenPolicy::new(auth.issuer.clone(), auth.audience.clone())
        .with_leeway(auth.leeway_secs);
    let authorizer = Authorizer::new(TokenVerifier::new(jwks, policy));

    let store = if config.seed_sample_drink {
        DrinkStore::with_sample()
    } else {
        DrinkStore::new()
    };

    let app = router(AppState::new(store, authorizer));
    let addr = config.bind_addr;

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    match &config.tls {
        Some(tls) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| ServerError::CryptoProvider)?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            info!(%addr, issuer = %auth.issuer, "coffee shop API listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, issuer = %auth.issuer, "coffee shop API listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    shutdown.cancel();
    info!("server stopped");
    Ok(())
}
