//! Signaling wire vocabulary: every frame that crosses a peer socket.
//!
//! Frames are single-line JSON records discriminated by a `type` field.
//! Hub-originated frames serialize from [`ServerFrame`]. Peer-originated
//! frames decode through [`ClientFrame::decode`], which keeps the raw
//! envelope of directed frames so negotiation payloads pass through the
//! hub untouched: forwarding adds exactly `from` and `name`, nothing else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Roster entries ────────────────────────────────────────────────────────────

/// One row of the roster as peers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub id: String,
    pub name: String,
}

// ── Hub → peer ────────────────────────────────────────────────────────────────

/// Frames the hub sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Handshake confirmation. Always the first frame on a session.
    Registered {
        peer_id: String,
        your_name: String,
        peers: Vec<PeerSummary>,
    },
    /// Reply to `get-peers`.
    PeerList { peers: Vec<PeerSummary> },
    /// Broadcast when a peer completes its handshake.
    NewPeer { peer: PeerSummary },
    /// Broadcast when a peer leaves, cleanly or not.
    PeerDisconnected { peer_id: String },
    /// Broadcast when a peer renames itself.
    PeerNameUpdated { peer_id: String, name: String },
    /// Sent to the renaming peer only.
    NameUpdatedAck { name: String },
    /// Non-fatal, per-request diagnostic.
    Error { message: String },
}

impl ServerFrame {
    /// Serialize for the wire. Hub-owned frames contain nothing that can
    /// fail to serialize.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("frame serialization failed")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// ── Peer → hub ────────────────────────────────────────────────────────────────

/// Frames peers send, decoded for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Offer(DirectedFrame),
    Answer(DirectedFrame),
    IceCandidate(DirectedFrame),
    GetPeers,
    /// Carries the raw name; emptiness and length policy apply at dispatch.
    UpdateName { name: String },
}

/// A frame addressed to one peer. The envelope keeps every field the
/// client sent; the hub never interprets anything beyond `type` and `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedFrame {
    pub to: String,
    envelope: Map<String, Value>,
}

impl DirectedFrame {
    /// Re-serialize the original envelope with the sender's identity
    /// stamped in. Overwrites any client-supplied `from`/`name`.
    pub fn forwarded(&self, from: &str, name: &str) -> String {
        let mut envelope = self.envelope.clone();
        envelope.insert("from".to_string(), Value::String(from.to_string()));
        envelope.insert("name".to_string(), Value::String(name.to_string()));
        Value::Object(envelope).to_string()
    }
}

/// Why an inbound frame was refused. The `Display` text is what goes back
/// to the peer in the `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Message too large.")]
    TooLarge,
    #[error("Invalid message format.")]
    Invalid,
    #[error("Unknown message type: {0}.")]
    UnknownType(String),
    #[error("Missing or empty '{0}' field.")]
    MissingField(&'static str),
}

impl ClientFrame {
    /// Decode one inbound text frame. Size is checked before parsing so an
    /// oversize frame costs nothing.
    pub fn decode(text: &str, max_bytes: usize) -> Result<Self, FrameError> {
        if text.len() > max_bytes {
            return Err(FrameError::TooLarge);
        }
        let value: Value = serde_json::from_str(text).map_err(|_| FrameError::Invalid)?;
        let Value::Object(envelope) = value else {
            return Err(FrameError::Invalid);
        };
        let Some(tag) = envelope.get("type").and_then(Value::as_str) else {
            return Err(FrameError::Invalid);
        };
        let tag = tag.to_string();

        match tag.as_str() {
            "offer" | "answer" | "ice-candidate" => {
                let to = envelope
                    .get("to")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if to.is_empty() {
                    return Err(FrameError::MissingField("to"));
                }
                let directed = DirectedFrame { to, envelope };
                Ok(match tag.as_str() {
                    "offer" => ClientFrame::Offer(directed),
                    "answer" => ClientFrame::Answer(directed),
                    _ => ClientFrame::IceCandidate(directed),
                })
            }
            "get-peers" => Ok(ClientFrame::GetPeers),
            "update-name" => {
                let name = envelope
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(ClientFrame::UpdateName { name })
            }
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}

// ── Names ─────────────────────────────────────────────────────────────────────

/// Normalize a client-supplied display name: trim, reject empty, truncate
/// to `max_chars` on a character boundary.
pub fn sanitize_name(raw: &str, max_chars: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
