//! Flash-sale HTTP server entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flash_sale::cache::{FastStore, RedisStore};
use flash_sale::db::{DurableStore, PostgresStore};
use flash_sale::engine::ReservationEngine;
use flash_sale::metrics::Metrics;
use flash_sale::sale::SaleManager;
use flash_sale::server::{build_router, AppState};
use flash_sale::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in development before anything reads the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flash_sale=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env());
    tracing::info!(
        environment = %config.server.environment,
        port = config.server.port,
        "starting flash-sale server"
    );

    let cache: Arc<dyn FastStore> = Arc::new(
        RedisStore::connect(&config.redis.url())
            .await
            .context("failed to connect to redis")?,
    );
    let db: Arc<dyn DurableStore> = Arc::new(
        PostgresStore::connect(&config.database)
            .await
            .context("failed to connect to postgres")?,
    );

    let metrics = Arc::new(Metrics::new());
    let sales = Arc::new(SaleManager::new(
        db.clone(),
        cache.clone(),
        config.sale.clone(),
    ));
    sales
        .start()
        .await
        .context("failed to start sale manager")?;

    let engine = Arc::new(ReservationEngine::new(
        cache.clone(),
        db.clone(),
        sales.clone(),
        config.sale.clone(),
    ));

    let state = AppState::new(config.clone(), cache, db, sales, engine, metrics);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(address = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down gracefully");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down gracefully");
        }
    }
}
