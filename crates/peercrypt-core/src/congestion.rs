//! AIMD congestion control (component of E.3, spec §4.5.3).
//!
//! Three independent, reusable pieces: [`RttEstimator`] (Jacobson/RFC
//! 6298 RTT and RTO estimation), [`DupAckTracker`] (duplicate-ACK
//! counting for fast retransmit), and [`AimdWindow`] (the cwnd/ssthresh
//! state machine itself). Factoring them out this way lets the QoS and
//! Parallel policies reuse the same RTT/dup-ack machinery per
//! sub-session instead of duplicating it, mirroring how the teacher
//! factors bandwidth/RTT sampling out of its own congestion state.

use std::time::Duration;

/// Default initial congestion window (spec §4.5.3).
pub const DEFAULT_INITIAL_WINDOW: u32 = 16 * 1024;
/// Default minimum congestion window.
pub const DEFAULT_MIN_WINDOW: u32 = 4 * 1024;
/// Default maximum congestion window.
pub const DEFAULT_MAX_WINDOW: u32 = 64 * 1024;
/// Default duplicate-ACK threshold that triggers fast retransmit.
pub const DEFAULT_DUP_ACK_THRESHOLD: u32 = 3;
/// Default RTO floor.
pub const DEFAULT_MIN_RTO: Duration = Duration::from_millis(200);
/// Default RTO ceiling.
pub const DEFAULT_MAX_RTO: Duration = Duration::from_secs(60);

/// RFC 6298-style smoothed-RTT / RTO estimator.
#[derive(Debug, Clone, Copy)]
pub struct RttEstimator {
    srtt: Option<Duration>,
    rttvar: Duration,
    rto: Duration,
    min_rto: Duration,
    max_rto: Duration,
}

impl RttEstimator {
    /// A fresh estimator with the given RTO bounds.
    #[must_use]
    pub fn new(min_rto: Duration, max_rto: Duration) -> Self {
        Self {
            srtt: None,
            rttvar: Duration::ZERO,
            rto: min_rto,
            min_rto,
            max_rto,
        }
    }

    /// Current RTO.
    #[must_use]
    pub fn rto(&self) -> Duration {
        self.rto
    }

    /// Current SRTT, if a sample has been observed yet.
    #[must_use]
    pub fn srtt(&self) -> Option<Duration> {
        self.srtt
    }

    /// Fold in a new RTT sample `m` (spec §4.5.3):
    ///
    /// ```text
    /// SRTT    ← (1-α)·SRTT + α·M,             α = 0.125
    /// RTTVAR  ← (1-β)·RTTVAR + β·|SRTT - M|,  β = 0.25
    /// RTO     ← max(min_RTO, SRTT + 4·RTTVAR)
    /// ```
    ///
    /// On the first sample, `SRTT ← M, RTTVAR ← M/2`.
    pub fn on_sample(&mut self, m: Duration) {
        match self.srtt {
            None => {
                self.srtt = Some(m);
                self.rttvar = m / 2;
            }
            Some(prev_srtt) => {
                let diff = prev_srtt.abs_diff(m);
                self.rttvar = self.rttvar.mul_f64(0.75) + diff.mul_f64(0.25);
                self.srtt = Some(prev_srtt.mul_f64(0.875) + m.mul_f64(0.125));
            }
        }
        let srtt = self.srtt.unwrap();
        self.rto = (srtt + self.rttvar * 4).clamp(self.min_rto, self.max_rto);
    }

    /// Double the RTO after an expiry, capped at `max_rto` (spec §4.5.3).
    pub fn on_rto_expiry(&mut self) {
        self.rto = (self.rto * 2).min(self.max_rto);
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_RTO, DEFAULT_MAX_RTO)
    }
}

/// Outcome of feeding one ACK to a [`DupAckTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupAckEvent {
    /// This ACK advances the cumulative sequence; no duplicate.
    NewAck,
    /// A duplicate of the last-seen ACK, below the fast-retransmit threshold.
    Duplicate,
    /// The duplicate count just reached the configured threshold.
    TripleDuplicate,
}

/// Returns whether 16-bit sequence `a` is strictly ahead of `b`,
/// accounting for wraparound at 65536 (spec §6.1).
#[must_use]
pub fn seq_after(a: u16, b: u16) -> bool {
    a.wrapping_sub(b) != 0 && a.wrapping_sub(b) < 0x8000
}

/// Tracks duplicate cumulative ACKs to drive fast retransmit.
#[derive(Debug, Clone, Copy)]
pub struct DupAckTracker {
    last_ack: Option<u16>,
    dup_count: u32,
    threshold: u32,
}

impl DupAckTracker {
    /// A tracker using `threshold` consecutive duplicates to trigger
    /// fast retransmit (spec §4.5.3 default 3, configurable).
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            last_ack: None,
            dup_count: 0,
            threshold,
        }
    }

    /// Feed a received cumulative ACK sequence number.
    pub fn on_ack(&mut self, ack_seq: u16) -> DupAckEvent {
        match self.last_ack {
            Some(last) if ack_seq == last => {
                self.dup_count += 1;
                if self.dup_count == self.threshold {
                    DupAckEvent::TripleDuplicate
                } else {
                    DupAckEvent::Duplicate
                }
            }
            Some(last) if !seq_after(ack_seq, last) => {
                // Reordered/old ACK; does not reset or advance dup tracking.
                DupAckEvent::Duplicate
            }
            _ => {
                self.last_ack = Some(ack_seq);
                self.dup_count = 0;
                DupAckEvent::NewAck
            }
        }
    }

    /// Reset after a fast retransmit or RTO-triggered retransmit.
    pub fn reset(&mut self) {
        self.dup_count = 0;
    }

    /// Current duplicate count.
    #[must_use]
    pub fn dup_count(&self) -> u32 {
        self.dup_count
    }
}

impl Default for DupAckTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DUP_ACK_THRESHOLD)
    }
}

/// Whether loss-detection mechanisms are active (spec §4.5.3, §9:
/// either may be independently disabled; if both are off the sender
/// issues no retransmission and a stalled session becomes fatal after
/// `max_RTO`).
#[derive(Debug, Clone, Copy)]
pub struct LossDetectionConfig {
    /// Whether RTO-based retransmission is enabled.
    pub timeout_enabled: bool,
    /// Whether triple-duplicate-ACK fast retransmit is enabled.
    pub dup_ack_enabled: bool,
}

impl Default for LossDetectionConfig {
    fn default() -> Self {
        Self {
            timeout_enabled: true,
            dup_ack_enabled: true,
        }
    }
}

/// The AIMD window state machine: cwnd, ssthresh, and the transitions
/// slow start / congestion avoidance / loss response apply to them
/// (spec §4.5.3).
#[derive(Debug, Clone, Copy)]
pub struct AimdWindow {
    cwnd: u32,
    ssthresh: u32,
    min_window: u32,
    max_window: u32,
    mss: u32,
}

impl AimdWindow {
    /// Construct a new window, clamping `initial_cwnd` into bounds.
    #[must_use]
    pub fn new(initial_cwnd: u32, min_window: u32, max_window: u32, mss: u32) -> Self {
        Self {
            cwnd: initial_cwnd.clamp(min_window, max_window),
            ssthresh: max_window,
            min_window,
            max_window,
            mss,
        }
    }

    /// Current congestion window, in bytes. Always within `[min_window, max_window]`
    /// (spec §8 property 3).
    #[must_use]
    pub fn cwnd(&self) -> u32 {
        self.cwnd
    }

    /// Current slow-start threshold, in bytes.
    #[must_use]
    pub fn ssthresh(&self) -> u32 {
        self.ssthresh
    }

    /// Whether the window is in slow start (`cwnd < ssthresh`).
    #[must_use]
    pub fn in_slow_start(&self) -> bool {
        self.cwnd < self.ssthresh
    }

    /// Apply one new (non-duplicate) ACK's window growth: additive
    /// `cwnd += MSS` in slow start, classical `cwnd += MSS²/cwnd` in
    /// congestion avoidance (spec §9 resolves the source's documented
    /// ambiguity this way).
    pub fn on_new_ack(&mut self) {
        let grown = if self.in_slow_start() {
            self.cwnd.saturating_add(self.mss)
        } else {
            let increment = ((u64::from(self.mss) * u64::from(self.mss)) / u64::from(self.cwnd.max(1)))
                .max(1) as u32;
            self.cwnd.saturating_add(increment)
        };
        self.cwnd = grown.min(self.max_window);
    }

    /// Apply a triple-duplicate-ACK loss event: halve cwnd (rounded
    /// down to the MSS grid), floor at `min_window`, set ssthresh to
    /// the same value (spec §4.5.3, §8 property 4).
    pub fn on_triple_duplicate_ack(&mut self) {
        let halved = (self.cwnd / 2 / self.mss.max(1)) * self.mss.max(1);
        let new_cwnd = halved.max(self.min_window);
        self.ssthresh = new_cwnd.max(self.min_window);
        self.cwnd = new_cwnd;
    }

    /// Apply an RTO expiry: halve ssthresh, collapse cwnd to
    /// `min_window` (spec §4.5.3).
    pub fn on_rto_expiry(&mut self) {
        self.ssthresh = (self.cwnd / 2).max(self.min_window);
        self.cwnd = self.min_window;
    }

    /// How many chunks of `chunk_size` bytes currently fit in flight
    /// (spec §3 invariant (d): outstanding-ACK set capacity).
    #[must_use]
    pub fn window_capacity(&self, chunk_size: u32) -> usize {
        (self.cwnd / chunk_size.max(1)) as usize
    }
}
