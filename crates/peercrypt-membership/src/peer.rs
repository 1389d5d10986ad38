//! Peer records and reliability scoring (spec §3, §4.3).

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// Success weight for the reliability update (spec §4.3): `R ← R + α·(1−R)`.
pub const RELIABILITY_ALPHA: f64 = 0.1;

/// Failure weight for the reliability update (spec §4.3): `R ← R − β·R`.
pub const RELIABILITY_BETA: f64 = 0.2;

/// Initial reliability assigned to a newly discovered peer.
pub const INITIAL_RELIABILITY: f64 = 1.0;

/// A peer's 32-bit opaque identity tag.
pub type NodeId = u32;

/// Uniquely identifies a peer record: `(node_id, address, port)` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerKey {
    /// Opaque node identifier.
    pub node_id: NodeId,
    /// IP address.
    pub address: IpAddr,
    /// UDP/TCP port.
    pub port: u16,
}

impl PeerKey {
    /// Build a key from a node id and socket address.
    #[must_use]
    pub fn new(node_id: NodeId, addr: SocketAddr) -> Self {
        Self {
            node_id,
            address: addr.ip(),
            port: addr.port(),
        }
    }

    /// The peer's socket address.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Outcome of an interaction with a peer, used to drive the
/// reliability update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// The interaction (gossip reply, health check, transfer attempt)
    /// succeeded.
    Success,
    /// The interaction failed or timed out.
    Failure,
}

/// A single peer's membership record.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    key: PeerKey,
    last_seen: Instant,
    srtt: Option<Duration>,
    failure_count: u32,
    reliability: f64,
    unreachable: bool,
}

impl PeerRecord {
    /// Create a newly discovered peer record at the current instant.
    #[must_use]
    pub fn new(key: PeerKey) -> Self {
        Self {
            key,
            last_seen: Instant::now(),
            srtt: None,
            failure_count: 0,
            reliability: INITIAL_RELIABILITY,
            unreachable: false,
        }
    }

    /// This peer's key.
    #[must_use]
    pub fn key(&self) -> PeerKey {
        self.key
    }

    /// Time since this peer was last heard from.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Current smoothed round-trip estimate, if any sample has been observed.
    #[must_use]
    pub fn srtt(&self) -> Option<Duration> {
        self.srtt
    }

    /// Current reliability score, always within `[0.0, 1.0]`.
    #[must_use]
    pub fn reliability(&self) -> f64 {
        self.reliability
    }

    /// Number of consecutive health-check failures since the last success.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Whether three consecutive PING failures have marked this peer
    /// unreachable (spec §4.3). Gossip continues to disseminate it
    /// until eviction.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.unreachable
    }

    /// Refresh `last_seen` to now, as happens on any gossip mention.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Smooth in a new RTT sample carried by a gossip message timestamp.
    pub fn smooth_rtt(&mut self, sample: Duration) {
        self.srtt = Some(match self.srtt {
            None => sample,
            Some(prev) => prev.mul_f64(0.875) + sample.mul_f64(0.125),
        });
    }

    /// Apply the reliability update for one interaction outcome (spec §4.3),
    /// clamping to `[0.0, 1.0]` afterwards.
    pub fn record_interaction(&mut self, outcome: InteractionOutcome) {
        self.touch();
        match outcome {
            InteractionOutcome::Success => {
                self.reliability += RELIABILITY_ALPHA * (1.0 - self.reliability);
                self.failure_count = 0;
                self.unreachable = false;
            }
            InteractionOutcome::Failure => {
                self.reliability -= RELIABILITY_BETA * self.reliability;
                self.failure_count += 1;
                if self.failure_count >= 3 {
                    self.unreachable = true;
                }
            }
        }
        self.reliability = self.reliability.clamp(0.0, 1.0);
    }

    /// Whether this peer should be evicted: reliability below `floor`
    /// and idle longer than `horizon` (spec §3).
    #[must_use]
    pub fn should_evict(&self, floor: f64, horizon: Duration) -> bool {
        self.reliability < floor && self.age() > horizon
    }

    /// The health-check deadline for a PING sent to this peer: `3·SRTT`,
    /// or a 2-second floor if SRTT is undefined (spec §4.3).
    #[must_use]
    pub fn health_check_deadline(&self) -> Duration {
        match self.srtt {
            Some(srtt) => (srtt * 3).max(Duration::from_secs(2)),
            None => Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerRecord {
        PeerRecord::new(PeerKey {
            node_id: 1,
            address: "127.0.0.1".parse().unwrap(),
            port: 9000,
        })
    }

    #[test]
    fn reliability_stays_in_bounds() {
        let mut p = peer();
        for _ in 0..100 {
            p.record_interaction(InteractionOutcome::Success);
            assert!((0.0..=1.0).contains(&p.reliability()));
        }
        for _ in 0..100 {
            p.record_interaction(InteractionOutcome::Failure);
            assert!((0.0..=1.0).contains(&p.reliability()));
        }
    }

    #[test]
    fn gossip_reliability_decay_matches_scenario_s6() {
        let mut p = peer();
        assert_eq!(p.reliability(), 1.0);
        for _ in 0..5 {
            p.record_interaction(InteractionOutcome::Failure);
        }
        assert!((p.reliability() - 0.32768).abs() < 1e-9);
        assert!(p.reliability() > 0.1, "not yet evicted at floor 0.1");
        p.record_interaction(InteractionOutcome::Failure);
        assert!((p.reliability() - 0.262144).abs() < 1e-9);
        assert!(p.reliability() > 0.1);
    }

    #[test]
    fn three_consecutive_failures_mark_unreachable() {
        let mut p = peer();
        p.record_interaction(InteractionOutcome::Failure);
        p.record_interaction(InteractionOutcome::Failure);
        assert!(!p.is_unreachable());
        p.record_interaction(InteractionOutcome::Failure);
        assert!(p.is_unreachable());
    }

    #[test]
    fn success_clears_unreachable_flag() {
        let mut p = peer();
        for _ in 0..3 {
            p.record_interaction(InteractionOutcome::Failure);
        }
        assert!(p.is_unreachable());
        p.record_interaction(InteractionOutcome::Success);
        assert!(!p.is_unreachable());
        assert_eq!(p.failure_count(), 0);
    }

    #[test]
    fn health_check_deadline_floors_at_two_seconds() {
        let p = peer();
        assert_eq!(p.health_check_deadline(), Duration::from_secs(2));
    }
}
