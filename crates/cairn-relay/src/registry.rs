//! The live-peer registry.
//!
//! One `RwLock<HashMap>` is the only state sessions share. Each operation
//! holds the lock for a single map access and nothing else, so all five
//! (insert, remove, lookup, rename, snapshot) are linearizable, and no
//! socket I/O ever happens under the lock. Iteration never escapes the
//! lock; callers get independent snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use cairn_core::frame::PeerSummary;

use crate::peer::{PeerHandle, PeerRecord};

/// The registry as shared between listener, sessions, and router.
pub type SharedRegistry = Arc<Registry>;

#[derive(Debug, Default)]
pub struct Registry {
    peers: RwLock<HashMap<String, PeerRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Self::new())
    }

    /// Add a peer under `id`. Returns false, leaving the map untouched,
    /// when the id is already taken: the caller regenerates and retries.
    pub async fn insert(&self, id: &str, record: PeerRecord) -> bool {
        let mut peers = self.peers.write().await;
        if peers.contains_key(id) {
            return false;
        }
        peers.insert(id.to_string(), record);
        true
    }

    /// Remove a peer. Returns whether this call actually removed it; only
    /// the caller that got `true` may broadcast the departure, which is
    /// what makes teardown idempotent.
    pub async fn remove(&self, id: &str) -> bool {
        self.peers.write().await.remove(id).is_some()
    }

    /// Clone the outbound handle of a live peer.
    pub async fn lookup(&self, id: &str) -> Option<PeerHandle> {
        self.peers.read().await.get(id).map(|r| r.handle.clone())
    }

    /// Update a peer's display name. Returns false when the peer is gone:
    /// a racing teardown won and the rename is dropped.
    pub async fn rename(&self, id: &str, name: &str) -> bool {
        match self.peers.write().await.get_mut(id) {
            Some(record) => {
                record.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Point-in-time roster, excluding at most one id. The returned list
    /// is an independent value, safe to iterate and serialize without the
    /// lock.
    pub async fn snapshot(&self, except: Option<&str>) -> Vec<PeerSummary> {
        self.peers
            .read()
            .await
            .iter()
            .filter(|(id, _)| Some(id.as_str()) != except)
            .map(|(id, record)| PeerSummary {
                id: id.clone(),
                name: record.name.clone(),
            })
            .collect()
    }

    /// Outbound handles for a broadcast, excluding at most one id. Handles
    /// are clones; the actual sends happen after the lock is released.
    pub async fn handles(&self, except: Option<&str>) -> Vec<PeerHandle> {
        self.peers
            .read()
            .await
            .iter()
            .filter(|(id, _)| Some(id.as_str()) != except)
            .map(|(_, record)| record.handle.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}
