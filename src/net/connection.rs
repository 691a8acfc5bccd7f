//! In-flight relay tracking.
//!
//! # Responsibilities
//! - Generate unique relay IDs for tracing
//! - Count requests between accept and the end of their relay
//! - Release the slot however the relay ends (done, failed, or dropped)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Global atomic counter for relay IDs.
/// Relaxed ordering is enough: only uniqueness matters.
static RELAY_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelayId(u64);

impl RelayId {
    pub fn new() -> Self {
        Self(RELAY_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RelayId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RelayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "relay-{}", self.0)
    }
}

/// Counts relays that have not finished yet.
#[derive(Debug, Clone, Default)]
pub struct RelayTracker {
    active: Arc<AtomicU64>,
}

impl RelayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new relay. The returned guard releases it on drop.
    pub fn track(&self) -> RelayGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        metrics::relay_started();
        RelayGuard {
            active: Arc::clone(&self.active),
            id: RelayId::new(),
        }
    }

    /// Number of relays currently in flight.
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Held by a request from acceptance until its body is fully relayed or
/// dropped.
#[derive(Debug)]
pub struct RelayGuard {
    active: Arc<AtomicU64>,
    id: RelayId,
}

impl RelayGuard {
    pub fn id(&self) -> RelayId {
        self.id
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        metrics::relay_finished();
        tracing::trace!(relay_id = %self.id, "Relay released");
    }
}
