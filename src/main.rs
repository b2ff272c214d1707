//! Project Cache - scope-aware query layer for a slow, unreliable backend
//!
//! Runs the query service as an HTTP sidecar in front of the upstream REST API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use project_cache::api::{create_router, AppState};
use project_cache::{spawn_cleanup_task, Config};

/// Main entry point for the query service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the query service and upstream client
/// 4. Start background cache cleanup task
/// 5. Log refresh events for operators
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "project_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Project Cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_ttl={}ms, breaker_max_failures={}, retry_max_attempts={}, port={}, upstream={}",
        config.cache_ttl_ms,
        config.breaker_max_failures,
        config.retry_max_attempts,
        config.server_port,
        config.upstream_url
    );

    let state = AppState::from_config(&config).context("failed to initialise application state")?;
    info!("Query service initialized");

    let cleanup_handle = spawn_cleanup_task(state.service.clone(), config.cleanup_interval);
    info!("Background cleanup task started");

    let mut refresh_events = state.service.subscribe();
    let event_log_handle = tokio::spawn(async move {
        loop {
            match refresh_events.recv().await {
                Ok(event) => {
                    info!(topic = event.topic(), invalidated = event.invalidated(), ?event, "refresh event");
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "refresh event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(vec![cleanup_handle, event_log_handle]))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts background tasks.
async fn shutdown_signal(background: Vec<tokio::task::JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
