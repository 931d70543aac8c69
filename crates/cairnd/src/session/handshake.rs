//! The opening half of a session: name intake, id assignment,
//! registration, welcome, arrival broadcast.

use anyhow::{Result, bail};
use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;

use cairn_core::frame::{PeerSummary, ServerFrame, sanitize_name};
use cairn_core::ident;
use cairn_relay::{PeerHandle, PeerRecord};

use crate::listener::AppState;

/// Give up after this many id collisions in a row. At 36^12 candidate ids
/// a second collision already means something else is wrong.
const MAX_ID_ATTEMPTS: usize = 8;

pub struct Established {
    pub id: String,
    pub name: String,
}

/// Take a socket from accepted to active: parse the display name, assign
/// an id, insert the registry record, send `registered`, announce the
/// arrival. The order is load-bearing: the record is in the registry
/// before the welcome is written, and the arrival broadcast goes out only
/// after the welcome succeeded. A failure leaves no trace: the record is
/// pulled without a departure broadcast, since nobody heard the arrival.
pub async fn establish(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    name_param: Option<&str>,
    state: &AppState,
    handle: PeerHandle,
) -> Result<Established> {
    let signaling = &state.config.signaling;
    let requested = name_param.and_then(|raw| sanitize_name(raw, signaling.max_name_chars));

    let mut id = ident::generate();
    let mut attempts = 1;
    let name = loop {
        let name = requested
            .clone()
            .unwrap_or_else(|| default_name(&id));
        let record = PeerRecord {
            name: name.clone(),
            handle: handle.clone(),
        };
        if state.registry.insert(&id, record).await {
            break name;
        }
        attempts += 1;
        if attempts > MAX_ID_ATTEMPTS {
            bail!("no unique peer id after {MAX_ID_ATTEMPTS} attempts");
        }
        tracing::warn!(%id, "peer id collision, regenerating");
        id = ident::generate();
    };

    // The welcome goes straight to the socket, ahead of anything other
    // sessions may already have queued for us, so `registered` is always
    // the first frame the peer sees.
    let peers = state.registry.snapshot(Some(&id)).await;
    let welcome = ServerFrame::Registered {
        peer_id: id.clone(),
        your_name: name.clone(),
        peers,
    };
    let write = ws_tx.send(Message::Text(welcome.encode().into()));
    match tokio::time::timeout(signaling.write_timeout(), write).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) | Err(_) => {
            state.registry.remove(&id).await;
            bail!("welcome write failed for {id}");
        }
    }

    let arrival = ServerFrame::NewPeer {
        peer: PeerSummary {
            id: id.clone(),
            name: name.clone(),
        },
    };
    state.router.broadcast(&arrival.encode(), Some(&id)).await;

    Ok(Established { id, name })
}

/// Fallback display name when the client supplied none.
fn default_name(id: &str) -> String {
    format!("peer-{}", &id[..4])
}
