//! The shared peer table (spec §3, §5).
//!
//! Mutation is serialized under a single writer lock; readers take a
//! consistent snapshot rather than touching the lock on the hot path.
//! Sessions elsewhere in the system hold `PeerKey`s, never direct
//! references into this table (spec §9, "Cyclic ownership").

use crate::peer::{InteractionOutcome, NodeId, PeerKey, PeerRecord};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Reliability floor below which an idle peer is evicted (spec §4.3 default).
pub const DEFAULT_EVICTION_FLOOR: f64 = 0.1;

/// Idle horizon after which a low-reliability peer becomes eligible
/// for eviction.
pub const DEFAULT_EVICTION_HORIZON: Duration = Duration::from_secs(600);

/// Shared, read-mostly peer membership table.
#[derive(Debug)]
pub struct PeerTable {
    inner: RwLock<HashMap<PeerKey, PeerRecord>>,
    eviction_floor: f64,
    eviction_horizon: Duration,
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new(DEFAULT_EVICTION_FLOOR, DEFAULT_EVICTION_HORIZON)
    }
}

impl PeerTable {
    /// Create an empty table with the given eviction policy.
    #[must_use]
    pub fn new(eviction_floor: f64, eviction_horizon: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            eviction_floor,
            eviction_horizon,
        }
    }

    /// Merge a peer mention from gossip, HELLO, or an explicit join.
    /// Creates the record if absent, otherwise refreshes `last_seen`
    /// (and smooths RTT, if the caller supplies a sample separately
    /// via [`PeerTable::smooth_rtt`]).
    pub async fn merge(&self, key: PeerKey) {
        let mut guard = self.inner.write().await;
        guard
            .entry(key)
            .and_modify(PeerRecord::touch)
            .or_insert_with(|| PeerRecord::new(key));
    }

    /// Smooth in an RTT sample for a known peer, a no-op if absent.
    pub async fn smooth_rtt(&self, key: PeerKey, sample: Duration) {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.get_mut(&key) {
            record.smooth_rtt(sample);
        }
    }

    /// Apply a reliability update for one interaction with a peer.
    /// The peer must already exist in the table (merged on first
    /// mention); this never implicitly creates a record.
    pub async fn record_interaction(&self, key: PeerKey, outcome: InteractionOutcome) {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.get_mut(&key) {
            record.record_interaction(outcome);
        }
    }

    /// Remove peers whose reliability has fallen below the floor and
    /// whose last-seen exceeds the eviction horizon. Returns the keys
    /// removed.
    pub async fn evict_stale(&self) -> Vec<PeerKey> {
        let mut guard = self.inner.write().await;
        let stale: Vec<PeerKey> = guard
            .values()
            .filter(|r| r.should_evict(self.eviction_floor, self.eviction_horizon))
            .map(PeerRecord::key)
            .collect();
        for key in &stale {
            guard.remove(key);
        }
        stale
    }

    /// Take a consistent, point-in-time snapshot of all known peers.
    pub async fn snapshot(&self) -> Vec<PeerRecord> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Look up a single peer by node id, returning the first match.
    /// Node ids are opaque tags and are expected to be globally unique
    /// in practice, but the table is keyed by the full `(node_id,
    /// address, port)` tuple so collisions do not corrupt state.
    pub async fn find_by_node_id(&self, node_id: NodeId) -> Option<PeerRecord> {
        self.inner
            .read()
            .await
            .values()
            .find(|r| r.key().node_id == node_id)
            .cloned()
    }

    /// Number of peers currently tracked.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
