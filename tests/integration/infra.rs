//! Integration test harness.
//!
//! Boots the hub in-process and drives it with real WebSocket clients.
//! Frames are handled as loose JSON values so tests assert on structure
//! rather than field order or exact error wording.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use cairn_core::config::CairnConfig;
use cairnd::listener::{AppState, serve};

/// How long a test waits for an expected frame before failing.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a test watches for frames that must NOT arrive.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(300);

pub struct TestHub {
    pub addr: SocketAddr,
    pub state: AppState,
}

/// Start a hub on 127.0.0.1 with an OS-assigned port and defaults.
pub async fn start_hub() -> Result<TestHub> {
    start_hub_with(CairnConfig::default()).await
}

pub async fn start_hub_with(config: CairnConfig) -> Result<TestHub> {
    let state = AppState::new(Arc::new(config));
    let tcp = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind test listener")?;
    let addr = tcp.local_addr()?;
    let serve_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = serve(serve_state, tcp).await {
            eprintln!("test hub exited with error: {e:#}");
        }
    });
    Ok(TestHub { addr, state })
}

impl TestHub {
    pub fn ws_url(&self, name: &str) -> String {
        format!(
            "ws://{}{}?name={}",
            self.addr, self.state.config.signaling.path, name
        )
    }

    /// Upgrade URL without a name parameter.
    pub fn ws_url_bare(&self) -> String {
        format!("ws://{}{}", self.addr, self.state.config.signaling.path)
    }

    pub fn api_url(&self, route: &str) -> String {
        format!("http://{}/api/{}", self.addr, route)
    }

    pub fn shutdown(&self) {
        let _ = self.state.shutdown_tx.send(());
    }

    pub async fn live_peers(&self) -> usize {
        self.state.registry.len().await
    }

    /// Poll until the registry holds exactly `n` peers, or fail.
    pub async fn wait_for_peer_count(&self, n: usize) -> Result<()> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            if self.live_peers().await == n {
                return Ok(());
            }
            if tokio::time::Instant::now() > deadline {
                bail!("registry never reached {n} peers (at {})", self.live_peers().await);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct Client {
    pub id: String,
    pub name: String,
    ws: Socket,
}

/// Connect with a display name and complete the handshake, returning the
/// client together with its `registered` frame.
pub async fn join(hub: &TestHub, name: &str) -> Result<(Client, Value)> {
    join_url(&hub.ws_url(name)).await
}

pub async fn join_url(url: &str) -> Result<(Client, Value)> {
    let (mut ws, _) = connect_async(url).await.context("websocket connect")?;
    let registered = recv_frame(&mut ws).await.context("welcome frame")?;
    if registered["type"] != "registered" {
        bail!("expected registered frame, got {registered}");
    }
    let id = registered["peerId"]
        .as_str()
        .context("peerId missing")?
        .to_string();
    let name = registered["yourName"]
        .as_str()
        .context("yourName missing")?
        .to_string();
    Ok((Client { id, name, ws }, registered))
}

impl Client {
    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .context("send frame")
    }

    /// Send arbitrary bytes as a text frame, bypassing JSON.
    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .context("send raw")
    }

    /// Next JSON frame, skipping protocol pings.
    pub async fn recv(&mut self) -> Result<Value> {
        recv_frame(&mut self.ws).await
    }

    /// Assert no JSON frame arrives within the silence window.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match tokio::time::timeout(SILENCE_WINDOW, next_text(&mut self.ws)).await {
            Err(_) => Ok(()),
            Ok(None) => Ok(()),
            Ok(Some(text)) => bail!("expected silence, got {text}"),
        }
    }

    /// True once the server side closes the socket.
    pub async fn closed_by_server(&mut self, within: Duration) -> bool {
        tokio::time::timeout(within, async {
            loop {
                match self.ws.next().await {
                    None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await
        .is_ok()
    }

    /// Close the WebSocket cleanly.
    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await.context("close socket")
    }

    /// Drop the TCP connection without a closing handshake, simulating a
    /// crashed client.
    pub fn crash(self) {
        drop(self.ws);
    }
}

async fn next_text(ws: &mut Socket) -> Option<String> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

pub async fn recv_frame(ws: &mut Socket) -> Result<Value> {
    let text = tokio::time::timeout(RECV_TIMEOUT, next_text(ws))
        .await
        .context("timed out waiting for frame")?
        .context("socket closed while waiting for frame")?;
    serde_json::from_str(&text).context("frame was not valid JSON")
}
