//! JSON status surface for operators and cairn-ctl.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use cairn_core::frame::PeerSummary;

use crate::listener::AppState;

// ── /api/status ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub peers: usize,
    pub uptime_secs: u64,
    pub signaling_path: String,
}

pub async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        peers: state.registry.len().await,
        uptime_secs: state.started_at.elapsed().as_secs(),
        signaling_path: state.config.signaling.path.clone(),
    })
}

// ── /api/peers ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<PeerSummary>,
}

pub async fn handle_peers(State(state): State<AppState>) -> Json<PeersResponse> {
    Json(PeersResponse {
        peers: state.registry.snapshot(None).await,
    })
}

// ── /api/shutdown ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<AppState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());
    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
