//! AIMD policy: defers entirely to the session's own congestion window
//! (spec §4.5.3). [`SenderSession`](crate::session::SenderSession)
//! already carries the [`AimdWindow`](crate::congestion::AimdWindow),
//! [`RttEstimator`](crate::congestion::RttEstimator), and
//! [`DupAckTracker`](crate::congestion::DupAckTracker) that drive
//! loss response, so this gate only has to translate "is there
//! capacity" into a [`SendDecision`].

use super::{PacingGate, SendDecision};
use std::time::Instant;

/// Admits a send whenever the caller reports spare window capacity.
/// The caller (the coordinator) supplies `outstanding` and the window
/// capacity check against `chunk_len` is delegated to
/// [`SenderSession::available_window`](crate::session::SenderSession::available_window),
/// since that's where the live `cwnd` lives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aimd {
    available_window: usize,
}

impl Aimd {
    /// A gate that currently sees `available_window` chunks of spare capacity.
    #[must_use]
    pub fn new(available_window: usize) -> Self {
        Self { available_window }
    }

    /// Refresh the gate's view of available window capacity, read from
    /// the session after each ACK or loss event.
    pub fn set_available_window(&mut self, available_window: usize) {
        self.available_window = available_window;
    }
}

impl PacingGate for Aimd {
    fn poll(&mut self, _chunk_len: u32, _outstanding: usize, _now: Instant) -> SendDecision {
        if self.available_window > 0 {
            SendDecision::SendNow
        } else {
            SendDecision::YieldForAck
        }
    }

    fn on_send(&mut self, _chunk_len: u32, _now: Instant) {
        self.available_window = self.available_window.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_when_window_exhausted() {
        let mut gate = Aimd::new(1);
        let now = Instant::now();
        assert_eq!(gate.poll(1024, 0, now), SendDecision::SendNow);
        gate.on_send(1024, now);
        assert_eq!(gate.poll(1024, 1, now), SendDecision::YieldForAck);
    }

    #[test]
    fn refresh_reopens_the_gate() {
        let mut gate = Aimd::new(0);
        assert_eq!(gate.poll(1024, 0, Instant::now()), SendDecision::YieldForAck);
        gate.set_available_window(2);
        assert_eq!(gate.poll(1024, 0, Instant::now()), SendDecision::SendNow);
    }
}
