//! Peer records and outbound handles.
//!
//! A session owns its socket outright. The registry holds just enough for
//! routing: the display name and a cloneable handle onto the session's
//! bounded outbound queue. Nothing outside the owning session writes a
//! record, except `name` through the registry's rename.

use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

/// What the registry stores per live peer.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub name: String,
    pub handle: PeerHandle,
}

/// Write side of one session's outbound queue.
///
/// `abort` lets a router operation wake the owning session when it decides
/// the session is beyond saving (queue overflow).
#[derive(Debug, Clone)]
pub struct PeerHandle {
    outbound: mpsc::Sender<String>,
    abort: Arc<Notify>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    /// The receive side is gone; the peer is mid-teardown.
    #[error("outbound queue closed")]
    Closed,
    /// The bounded queue is full; the peer is not draining.
    #[error("outbound queue full")]
    Overflow,
}

impl PeerHandle {
    /// Create a handle plus the queue it feeds. The receiver goes to the
    /// session's writer task.
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(depth);
        (
            Self {
                outbound,
                abort: Arc::new(Notify::new()),
            },
            rx,
        )
    }

    /// Queue one serialized frame without blocking.
    pub fn enqueue(&self, frame: String) -> Result<(), EnqueueError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Overflow,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Whether the owning session can still drain frames.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Ask the owning session to tear itself down.
    pub fn abort(&self) {
        self.abort.notify_one();
    }

    /// Resolves once something called [`abort`](Self::abort). The permit is
    /// stored, so an abort that fires before anyone waits is not lost.
    pub async fn aborted(&self) {
        self.abort.notified().await;
    }

    /// An abort-only view for the session's writer task. Unlike a full
    /// handle clone it keeps no queue sender alive, so the queue still
    /// closes once the registry record and the session drop theirs.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            abort: self.abort.clone(),
        }
    }
}

/// Flags a session for teardown without holding its outbound queue open.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    abort: Arc<Notify>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.abort.notify_one();
    }
}
