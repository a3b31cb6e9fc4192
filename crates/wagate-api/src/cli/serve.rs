//! `wagate serve`: run the REST API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use console::style;

use crate::http::router::build_router;
use crate::state::AppState;

pub async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);

    if state.config.sessions.restore_on_start {
        let report = state.gateway.restore_sessions().await?;
        if !report.restored.is_empty() {
            println!(
                "  {} Restored {} session(s)",
                style("↻").bold(),
                report.restored.len()
            );
        }
        for (id, error) in &report.failed {
            println!("  {} Could not restore '{id}': {error}", style("!").yellow().bold());
        }
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!(
        "  {} wagate listening on {}",
        style("⚡").bold(),
        style(format!("http://{addr}")).cyan()
    );
    if state.api_key_hash.is_none() {
        println!(
            "  {}",
            style("No server.api_key configured: the API is unauthenticated").yellow()
        );
    }
    println!("  {}", style("Press Ctrl+C to stop").dim());
    tracing::info!(%addr, data_dir = %state.data_dir.display(), backend = ?state.config.store.backend, "server started");

    let gateway = state.gateway.clone();
    let shutdown = state.shutdown.clone();
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutdown requested; closing event streams");
            shutdown.cancel();
        })
        .await?;

    gateway.shutdown().await;
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
}
