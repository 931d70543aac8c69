//! cairnd — the cairn signaling hub daemon.

use anyhow::{Context, Result};
use std::sync::Arc;

use cairn_core::config::CairnConfig;
use cairnd::listener::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = CairnConfig::load().context("failed to load configuration")?;
    let state = AppState::new(Arc::new(config));

    let bind = format!(
        "{}:{}",
        state.config.network.listen_addr, state.config.network.port
    );
    let tcp = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let addr = tcp.local_addr()?;
    tracing::info!(%addr, path = %state.config.signaling.path, "cairnd starting");

    // Ctrl-C feeds the same shutdown channel the API route uses
    let shutdown_tx = state.shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    listener::serve(state, tcp).await
}
