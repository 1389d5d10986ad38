//! Transmission policies (component E, spec §4.5).
//!
//! Six independent policies decide *when* a session's next chunk goes
//! out: given the session's outstanding-ACK set, its congestion window,
//! and an iterator over remaining chunks, a policy says "send now",
//! "wait until some wall-clock instant", or "yield until an ACK
//! arrives". [`PacingGate`] is that single-session admission contract;
//! [`Normal`], [`TokenBucket`], and [`Aimd`] implement it directly.
//! [`Qos`] and [`Parallel`] operate one layer up, scheduling *across*
//! multiple chunk ranges or priority classes rather than gating a
//! single stream, and [`Multicast`] fans a single stream out to many
//! peers — each gets its own module because the shape of the decision
//! differs, not because the contract does.

mod aimd;
mod multicast;
mod normal;
mod parallel;
mod qos;
mod token_bucket;

pub use aimd::Aimd;
pub use multicast::{MulticastFanout, PeerProgress};
pub use normal::Normal;
pub use parallel::{partition_range, WorkerAssignment};
pub use qos::{Priority, QosScheduler};
pub use token_bucket::TokenBucket;

use std::time::Instant;

/// What a [`PacingGate`] decides for the next chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDecision {
    /// Send the next chunk immediately.
    SendNow,
    /// Don't send yet; try again after this instant.
    WaitUntil(Instant),
    /// Blocked until an ACK frees window capacity.
    YieldForAck,
}

/// Single-session admission contract shared by the Normal, Token
/// Bucket, and AIMD policies (spec §4.5.1-3).
pub trait PacingGate: Send {
    /// Decide whether `chunk_len` bytes may go out right now.
    fn poll(&mut self, chunk_len: u32, outstanding: usize, now: Instant) -> SendDecision;

    /// Record that a chunk of `chunk_len` bytes was actually sent.
    fn on_send(&mut self, chunk_len: u32, now: Instant);
}
