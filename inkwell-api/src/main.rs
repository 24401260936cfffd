//! # Inkwell API Server
//!
//! REST backend of the Inkwell blog: posts, categories, threaded comments,
//! likes, newsletter and CMS page content.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/inkwell JWT_SECRET=... cargo run -p inkwell-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use inkwell_api::{
    app::{build_router, AppState},
    config::Config,
    error::set_expose_internal_errors,
};
use inkwell_shared::{
    cache::{RedisClient, RedisConfig, ResponseCache},
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig as PoolConfig},
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "Inkwell API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    set_expose_internal_errors(!config.api.production);

    let pool = create_pool(PoolConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let cache = connect_cache(&config).await;

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid API_HOST/API_PORT")?;

    let app = build_router(AppState::new(pool.clone(), config, cache));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "inkwell_api=debug,inkwell_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Connects Redis when configured; any failure leaves the cache disabled
async fn connect_cache(config: &Config) -> ResponseCache {
    let Some(url) = config.cache.redis_url.as_deref() else {
        tracing::info!("REDIS_URL not set, response cache and rate limiting disabled");
        return ResponseCache::disabled();
    };

    match RedisClient::connect(RedisConfig::new(url)).await {
        Ok(client) => ResponseCache::new(client, Duration::from_secs(config.cache.ttl_secs)),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, continuing without cache");
            ResponseCache::disabled()
        }
    }
}

/// Waits for `signal`; if its listener cannot be installed, never resolves
async fn until_signal<F>(name: &str, signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, signal = name, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = until_signal("Ctrl-C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_listener_never_resolves() {
        let failed = until_signal("test", async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no handler"))
        });

        let result = tokio::time::timeout(Duration::from_millis(50), failed).await;
        assert!(result.is_err(), "shutdown must not start when a listener fails");
    }

    #[tokio::test]
    async fn test_delivered_signal_resolves() {
        let delivered = until_signal("test", async { Ok(()) });

        let result = tokio::time::timeout(Duration::from_millis(50), delivered).await;
        assert!(result.is_ok());
    }
}
