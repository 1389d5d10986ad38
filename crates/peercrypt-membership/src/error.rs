//! Error types for peer membership.

use thiserror::Error;

/// Membership-layer errors.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Gossip wire message shorter than its declared header/entry size.
    #[error("gossip message too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum required length.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Unknown gossip message type byte.
    #[error("unknown gossip message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// Unsupported gossip wire version.
    #[error("unsupported gossip version: {0}")]
    UnsupportedVersion(u8),

    /// Peer entry count does not match the declared `peer_count` field.
    #[error("peer entry count mismatch: declared {declared}, found {found}")]
    PeerCountMismatch {
        /// Count declared in the header.
        declared: usize,
        /// Count actually present in the buffer.
        found: usize,
    },

    /// A health-check PING timed out without a matching PONG.
    #[error("health check timed out waiting for peer {0:#010x}")]
    HealthCheckTimeout(u32),

    /// Connection attempt exhausted its retry budget.
    #[error("connection attempt exhausted retry budget for peer {0:#010x}")]
    RetryBudgetExhausted(u32),
}
