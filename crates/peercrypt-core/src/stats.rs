//! Transfer observability (spec §9 "Global mutable statistics").
//!
//! Rather than process-wide mutable counters, the coordinator invokes
//! an injected [`TransferObserver`]; an external front-end (the CLI,
//! out of scope here) subscribes by supplying its own implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::state_machine::TransferState;

/// Capability the session coordinator reports transfer events to.
pub trait TransferObserver: Send + Sync {
    /// A chunk was handed to the transport.
    fn on_chunk_sent(&self, _seq: u16, _len: usize) {}
    /// A chunk's cumulative ACK arrived.
    fn on_chunk_acked(&self, _seq: u16) {}
    /// A chunk was retransmitted (fast retransmit or RTO).
    fn on_retransmit(&self, _seq: u16) {}
    /// The congestion window changed.
    fn on_cwnd_change(&self, _cwnd: u32, _ssthresh: u32) {}
    /// The session's state machine transitioned.
    fn on_state_transition(&self, _from: TransferState, _to: TransferState) {}
    /// A frame failed MAC verification and was dropped.
    fn on_mac_failure(&self) {}
}

/// No-op observer, the coordinator's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TransferObserver for NullObserver {}

/// An atomics-backed observer useful for tests and for a CLI to poll.
#[derive(Debug, Default)]
pub struct CountingObserver {
    chunks_sent: AtomicU64,
    chunks_acked: AtomicU64,
    retransmits: AtomicU64,
    mac_failures: AtomicU64,
}

impl CountingObserver {
    /// A fresh, zeroed counter set, ready to be shared via `Arc`.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total chunks sent.
    #[must_use]
    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent.load(Ordering::Relaxed)
    }

    /// Total chunks acknowledged.
    #[must_use]
    pub fn chunks_acked(&self) -> u64 {
        self.chunks_acked.load(Ordering::Relaxed)
    }

    /// Total retransmissions.
    #[must_use]
    pub fn retransmits(&self) -> u64 {
        self.retransmits.load(Ordering::Relaxed)
    }

    /// Total MAC verification failures.
    #[must_use]
    pub fn mac_failures(&self) -> u64 {
        self.mac_failures.load(Ordering::Relaxed)
    }
}

impl TransferObserver for CountingObserver {
    fn on_chunk_sent(&self, _seq: u16, _len: usize) {
        self.chunks_sent.fetch_add(1, Ordering::Relaxed);
    }

    fn on_chunk_acked(&self, _seq: u16) {
        self.chunks_acked.fetch_add(1, Ordering::Relaxed);
    }

    fn on_retransmit(&self, _seq: u16) {
        self.retransmits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_mac_failure(&self) {
        self.mac_failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_observer_tracks_events() {
        let obs = CountingObserver::new();
        obs.on_chunk_sent(0, 100);
        obs.on_chunk_sent(1, 100);
        obs.on_chunk_acked(0);
        obs.on_retransmit(1);
        obs.on_mac_failure();
        assert_eq!(obs.chunks_sent(), 2);
        assert_eq!(obs.chunks_acked(), 1);
        assert_eq!(obs.retransmits(), 1);
        assert_eq!(obs.mac_failures(), 1);
    }

    #[test]
    fn null_observer_is_harmless() {
        let obs = NullObserver;
        obs.on_chunk_sent(0, 0);
        obs.on_state_transition(TransferState::Idle, TransferState::Connecting);
    }
}
