//! Multicast policy: one-to-many fan-out of a single transfer to
//! several peers at once (spec §4.5.6).

use peercrypt_membership::PeerKey;
use std::collections::HashMap;

/// Per-peer acknowledgment progress within a fan-out group.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerProgress {
    /// Highest cumulative sequence number this peer has ACKed.
    pub last_ack: Option<u16>,
    /// Number of chunks retransmitted to this peer specifically.
    pub retransmits: u32,
}

/// Tracks one outbound group: the same chunk stream is sent to every
/// member, and each member's ACK stream is tracked independently
/// (spec §4.5.6: "the slowest receiver does not block delivery to
/// the others; each peer's window and retransmissions are tracked
/// separately").
#[derive(Debug, Clone, Default)]
pub struct MulticastFanout {
    members: HashMap<PeerKey, PeerProgress>,
}

impl MulticastFanout {
    /// An empty fan-out group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer to the fan-out group.
    pub fn add_member(&mut self, peer: PeerKey) {
        self.members.entry(peer).or_default();
    }

    /// Record an ACK from one member.
    pub fn on_ack(&mut self, peer: PeerKey, ack_seq: u16) {
        if let Some(progress) = self.members.get_mut(&peer) {
            progress.last_ack = Some(match progress.last_ack {
                Some(prev) if crate::congestion::seq_after(prev, ack_seq) => prev,
                _ => ack_seq,
            });
        }
    }

    /// Record a retransmission sent to one member.
    pub fn on_retransmit(&mut self, peer: PeerKey) {
        if let Some(progress) = self.members.get_mut(&peer) {
            progress.retransmits += 1;
        }
    }

    /// The lowest cumulative ACK across all members: the point below
    /// which every member has confirmed receipt.
    #[must_use]
    pub fn slowest_ack(&self) -> Option<u16> {
        self.members
            .values()
            .map(|p| p.last_ack.unwrap_or(0))
            .min()
    }

    /// Whether every member has ACKed through `final_seq`.
    #[must_use]
    pub fn all_complete(&self, final_seq: u16) -> bool {
        !self.members.is_empty()
            && self
                .members
                .values()
                .all(|p| p.last_ack == Some(final_seq))
    }

    /// Current member count.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
