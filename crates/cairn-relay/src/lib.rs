//! Shared relay state for the cairn hub: per-peer outbound handles, the
//! live-peer registry, and the router built on both.

pub mod peer;
pub mod registry;
pub mod router;

pub use peer::{AbortHandle, EnqueueError, PeerHandle, PeerRecord};
pub use registry::{Registry, SharedRegistry};
pub use router::{Delivery, Router};
