//! The hub's single listener: WebSocket upgrades on the signaling path,
//! JSON status API beside it, graceful shutdown with a bounded drain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use cairn_core::config::CairnConfig;
use cairn_relay::{Registry, Router, SharedRegistry};

use crate::api;
use crate::session;

/// How long shutdown waits for sessions to unwind before the process
/// gives up on them.
const DRAIN_WINDOW: Duration = Duration::from_secs(5);

/// Everything a request handler or session needs, cloned per task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CairnConfig>,
    pub registry: SharedRegistry,
    pub router: Router,
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<CairnConfig>) -> Self {
        let registry = Registry::shared();
        let router = Router::new(registry.clone());
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            registry,
            router,
            shutdown_tx,
            started_at: Instant::now(),
        }
    }
}

/// Build the daemon's router: the signaling upgrade plus the status API.
/// Non-matching paths fall through to axum's 404.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .route(&state.config.signaling.path, get(upgrade_handler))
        .route("/api/status", get(api::handle_status))
        .route("/api/peers", get(api::handle_peers))
        .route("/api/shutdown", post(api::handle_shutdown))
        .layer(cors)
        .with_state(state)
}

/// Serve until the shutdown channel fires, then wait for sessions to
/// drain.
pub async fn serve(state: AppState, tcp: tokio::net::TcpListener) -> anyhow::Result<()> {
    let registry = state.registry.clone();
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    let app = build_router(state);

    axum::serve(tcp, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    // Sessions observe the same channel; give them a bounded window to
    // unwind before the process exits.
    let deadline = Instant::now() + DRAIN_WINDOW;
    while !registry.is_empty().await && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    let leftover = registry.len().await;
    if leftover > 0 {
        tracing::warn!(leftover, "drain window elapsed with sessions still registered");
    } else {
        tracing::info!("all sessions closed");
    }
    Ok(())
}

/// GET <signaling path>: upgrade to a session socket. The display name
/// arrives percent-encoded in the `name` query parameter.
async fn upgrade_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Result<Response, StatusCode> {
    if !origin_allowed(&state.config.signaling.allowed_origins, &headers) {
        tracing::warn!("upgrade refused: origin not allowed");
        return Err(StatusCode::FORBIDDEN);
    }
    let name = params.get("name").cloned();
    Ok(ws.on_upgrade(move |socket| session::run(socket, name, state)))
}

/// Origin screening. Requests without an Origin header (CLI clients,
/// tests) pass; browsers always send one.
fn origin_allowed(allowed: &[String], headers: &HeaderMap) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) => allowed.iter().any(|a| a == origin),
        None => true,
    }
}
