//! sg-server: HTTP API server for soundgate.
//!
//! This crate ties the other sg-* crates into a running server:
//!
//! - Axum-based HTTP API with authentication, rate limiting, and CORS
//! - The byte-range stream responder in [`streaming`]
//! - Prometheus metrics and an OpenAPI document
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod streaming;

use std::future::Future;
use std::net::SocketAddr;

use sg_core::config::Config;

use crate::context::AppContext;

/// Start the soundgate server.
///
/// Opens the database, builds the blob store selected by configuration,
/// installs the metrics recorder, and serves until a shutdown signal is
/// received.
pub async fn start(config: Config) -> sg_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    let db = sg_db::pool::init_pool(db_path)?;
    if existed {
        tracing::info!("Database opened (existing) at {}", db_path.display());
    } else {
        tracing::info!("Database created (new) at {}", db_path.display());
    }

    let store = sg_storage::build_store(&config.storage)?;
    let metrics = routes::metrics::install_recorder();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sg_core::Error::Validation(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(db, config, store).with_metrics(metrics);
    if let Some(limiter) = ctx.limiter.clone() {
        tokio::spawn(middleware::rate_limit::prune_idle_clients(
            limiter,
            std::time::Duration::from_secs(60),
        ));
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| sg_core::Error::Unexpected(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr}");
    serve(listener, ctx, shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve the application on an already-bound listener until `shutdown`
/// resolves. In-flight streams are allowed to finish. Peer addresses are
/// recorded for per-client rate limiting.
pub async fn serve(
    listener: tokio::net::TcpListener,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> sg_core::Result<()> {
    let app = router::build_router(ctx);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| sg_core::Error::Io { source: e })
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
