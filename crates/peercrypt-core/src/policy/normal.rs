//! Normal policy: unconstrained back-to-back streaming, bounded only
//! by a small fixed sliding window of outstanding ACKs (spec §4.5.1).

use super::{PacingGate, SendDecision};
use std::time::Instant;

/// Admits sends as long as fewer than `window` chunks are outstanding.
/// No rate shaping, no congestion response: this is the simplest
/// policy, intended for trusted links where AIMD's caution is wasted.
#[derive(Debug, Clone, Copy)]
pub struct Normal {
    window: usize,
}

impl Normal {
    /// A gate that admits up to `window` outstanding chunks at once.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl PacingGate for Normal {
    fn poll(&mut self, _chunk_len: u32, outstanding: usize, _now: Instant) -> SendDecision {
        if outstanding < self.window {
            SendDecision::SendNow
        } else {
            SendDecision::YieldForAck
        }
    }

    fn on_send(&mut self, _chunk_len: u32, _now: Instant) {}
}
