//! Directed and broadcast delivery on top of the registry.
//!
//! The router only ever touches registry operations and per-peer queue
//! handles. Handles are cloned out of the registry first and written to
//! afterwards, so no send happens while the registry lock is held.

use crate::peer::EnqueueError;
use crate::registry::SharedRegistry;

/// Outcome of a directed send, reported back to the originating session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No live peer under that id.
    NoSuchPeer,
    /// The peer exists but its outbound side cannot take the frame.
    NotReady,
}

#[derive(Debug, Clone)]
pub struct Router {
    registry: SharedRegistry,
}

impl Router {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Deliver one serialized frame to `target`. A full target queue fails
    /// the send and flags the target for teardown.
    pub async fn send_to(&self, target: &str, frame: String) -> Delivery {
        let Some(handle) = self.registry.lookup(target).await else {
            return Delivery::NoSuchPeer;
        };
        if !handle.is_open() {
            return Delivery::NotReady;
        }
        match handle.enqueue(frame) {
            Ok(()) => Delivery::Delivered,
            Err(EnqueueError::Closed) => Delivery::NotReady,
            Err(EnqueueError::Overflow) => {
                handle.abort();
                Delivery::NotReady
            }
        }
    }

    /// Queue a frame to every live peer except `except`. Per-peer failures
    /// are swallowed; a failing target is cleaned up by its own session.
    pub async fn broadcast(&self, frame: &str, except: Option<&str>) {
        for handle in self.registry.handles(except).await {
            match handle.enqueue(frame.to_string()) {
                Ok(()) | Err(EnqueueError::Closed) => {}
                Err(EnqueueError::Overflow) => handle.abort(),
            }
        }
    }
}
