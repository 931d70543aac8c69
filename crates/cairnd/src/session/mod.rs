//! Per-socket session: handshake, inbound dispatch, teardown.
//!
//! One session owns one peer socket. The reader half drives dispatch; a
//! writer task drains the bounded outbound queue. The only state shared
//! with other sessions is the registry, reached through the router, so a
//! session failing takes nothing down but itself.

mod handshake;

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use cairn_core::frame::{ClientFrame, DirectedFrame, ServerFrame, sanitize_name};
use cairn_relay::{AbortHandle, Delivery, EnqueueError, PeerHandle};

use crate::listener::AppState;

/// Interval between protocol-level keepalive pings. Keeps NAT bindings
/// warm for peers that only watch the roster.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Drive one accepted socket from handshake to teardown.
pub async fn run(socket: WebSocket, name_param: Option<String>, state: AppState) {
    let (mut ws_tx, ws_rx) = socket.split();

    let depth = state.config.signaling.outbound_queue_depth;
    let (handle, outbound_rx) = PeerHandle::new(depth);

    let established =
        match handshake::establish(&mut ws_tx, name_param.as_deref(), &state, handle.clone()).await
        {
            Ok(established) => established,
            Err(e) => {
                tracing::debug!(error = %e, "handshake failed");
                let _ = ws_tx.send(Message::Close(None)).await;
                return;
            }
        };
    let id = established.id.clone();
    tracing::info!(peer_id = %id, name = %established.name, "peer registered");

    let write_timeout = state.config.signaling.write_timeout();
    let writer = tokio::spawn(write_loop(
        ws_tx,
        outbound_rx,
        handle.abort_handle(),
        write_timeout,
    ));

    let mut session = Session {
        id: established.id,
        name: established.name,
        handle,
        state,
    };
    session.read_loop(ws_rx).await;
    session.teardown().await;

    // The registry record held a queue sender; teardown dropped it, and
    // dropping the session here drops the last one, so the writer drains
    // what it has and closes the socket.
    drop(session);
    let _ = writer.await;

    tracing::info!(peer_id = %id, "session closed");
}

struct Session {
    id: String,
    name: String,
    handle: PeerHandle,
    state: AppState,
}

impl Session {
    /// Read frames until the peer leaves, the transport fails, the idle
    /// timeout fires, the writer flags the session, or the hub shuts down.
    async fn read_loop(&mut self, mut ws_rx: SplitStream<WebSocket>) {
        let mut shutdown_rx = self.state.shutdown_tx.subscribe();
        let idle = self.state.config.signaling.read_idle_timeout();

        loop {
            let inbound = tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::debug!(peer_id = %self.id, "hub shutdown, closing session");
                    break;
                }
                _ = self.handle.aborted() => {
                    tracing::warn!(peer_id = %self.id, "session aborted, outbound side failed");
                    break;
                }
                // The sleep is rebuilt each iteration, so it measures time
                // since the last inbound frame.
                _ = tokio::time::sleep(idle.unwrap_or(Duration::ZERO)), if idle.is_some() => {
                    tracing::debug!(peer_id = %self.id, "read idle timeout");
                    break;
                }
                inbound = ws_rx.next() => inbound,
            };

            match inbound {
                Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()).await,
                Some(Ok(Message::Binary(_))) => {
                    self.reply(ServerFrame::error("Invalid message format."));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    tracing::debug!(peer_id = %self.id, "peer closed");
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(peer_id = %self.id, error = %e, "socket error");
                    break;
                }
                None => break,
            }
        }
    }

    /// Decode and route one inbound frame. Nothing here is fatal to the
    /// session except through the transport itself.
    async fn dispatch(&mut self, text: &str) {
        let frame = match ClientFrame::decode(text, self.state.config.signaling.max_frame_bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(peer_id = %self.id, error = %e, "rejecting inbound frame");
                self.reply(ServerFrame::error(e.to_string()));
                return;
            }
        };

        match frame {
            ClientFrame::Offer(directed)
            | ClientFrame::Answer(directed)
            | ClientFrame::IceCandidate(directed) => self.forward(directed).await,
            ClientFrame::GetPeers => {
                let peers = self.state.registry.snapshot(Some(&self.id)).await;
                self.reply(ServerFrame::PeerList { peers });
            }
            ClientFrame::UpdateName { name } => self.rename(&name).await,
        }
    }

    /// Stamp the sender's identity into a directed frame and hand it to
    /// the router.
    async fn forward(&self, directed: DirectedFrame) {
        let payload = directed.forwarded(&self.id, &self.name);
        match self.state.router.send_to(&directed.to, payload).await {
            Delivery::Delivered => {}
            Delivery::NoSuchPeer | Delivery::NotReady => {
                self.reply(ServerFrame::error(format!(
                    "Peer {} not available.",
                    directed.to
                )));
            }
        }
    }

    async fn rename(&mut self, raw: &str) {
        let Some(name) = sanitize_name(raw, self.state.config.signaling.max_name_chars) else {
            self.reply(ServerFrame::error("Invalid name."));
            return;
        };
        if !self.state.registry.rename(&self.id, &name).await {
            // A racing teardown already pulled the record; nothing to announce.
            return;
        }
        self.name = name.clone();
        let update = ServerFrame::PeerNameUpdated {
            peer_id: self.id.clone(),
            name: name.clone(),
        };
        self.state.router.broadcast(&update.encode(), Some(&self.id)).await;
        self.reply(ServerFrame::NameUpdatedAck { name });
        tracing::debug!(peer_id = %self.id, name = %self.name, "name updated");
    }

    /// Queue a frame to this session's own peer. An overflow here means we
    /// are the congested session; flag ourselves and let the read loop
    /// exit.
    fn reply(&self, frame: ServerFrame) {
        if let Err(EnqueueError::Overflow) = self.handle.enqueue(frame.encode()) {
            self.handle.abort();
        }
    }

    /// Remove the peer and announce the departure. The registry's boolean
    /// return makes this idempotent: whichever caller actually removed the
    /// record broadcasts, any later call is a no-op.
    async fn teardown(&self) {
        if self.state.registry.remove(&self.id).await {
            let gone = ServerFrame::PeerDisconnected {
                peer_id: self.id.clone(),
            };
            self.state.router.broadcast(&gone.encode(), Some(&self.id)).await;
            tracing::info!(peer_id = %self.id, "peer disconnected");
        }
    }
}

/// Drain the outbound queue onto the socket. Exits when the queue closes
/// (teardown dropped the senders) or a write fails or times out; a failed
/// write flags the session so the read side stops too.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
    abort: AbortHandle,
    write_timeout: Duration,
) {
    let start = tokio::time::Instant::now() + PING_INTERVAL;
    let mut ping = tokio::time::interval_at(start, PING_INTERVAL);

    loop {
        let message = tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(text) => Message::Text(text.into()),
                None => break,
            },
            _ = ping.tick() => Message::Ping(Vec::new().into()),
        };
        match tokio::time::timeout(write_timeout, ws_tx.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) | Err(_) => {
                abort.abort();
                return;
            }
        }
    }

    // Queue drained after teardown: say goodbye properly.
    let _ = ws_tx.send(Message::Close(None)).await;
}
