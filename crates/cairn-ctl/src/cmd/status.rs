//! Hub status, roster, and shutdown commands.

use anyhow::{Context, Result};
use serde::Deserialize;

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    peers: usize,
    uptime_secs: u64,
    signaling_path: String,
}

#[derive(Deserialize)]
struct PeersResponse {
    peers: Vec<PeerInfo>,
}

#[derive(Deserialize)]
struct PeerInfo {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/status"))
        .await
        .context("failed to connect to cairnd — is it running?")?
        .json::<StatusResponse>()
        .await
        .context("failed to parse status response")?;

    println!("═══════════════════════════════════════");
    println!("  Cairn Hub Status");
    println!("═══════════════════════════════════════");
    println!("  Connected peers : {}", resp.peers);
    println!("  Uptime          : {}s", resp.uptime_secs);
    println!("  Signaling path  : {}", resp.signaling_path);

    Ok(())
}

pub async fn cmd_peers(port: u16) -> Result<()> {
    let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/peers"))
        .await
        .context("failed to connect to cairnd — is it running?")?
        .json::<PeersResponse>()
        .await
        .context("failed to parse roster response")?;

    if resp.peers.is_empty() {
        println!("No peers connected.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Connected Peers ({})", resp.peers.len());
    println!("═══════════════════════════════════════");

    for p in &resp.peers {
        println!("  ┌─ {}", p.id);
        println!("  └─ name : {}", p.name);
    }

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/api/shutdown"))
        .send()
        .await
        .context("failed to connect to cairnd — is it running?")?
        .json::<ShutdownResponse>()
        .await
        .context("failed to parse shutdown response")?;

    println!("{}", resp.message);
    Ok(())
}
