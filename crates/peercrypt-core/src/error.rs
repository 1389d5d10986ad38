//! Error types for the PeerCrypt core protocol.

use thiserror::Error;

/// Top-level core protocol error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Frame parsing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Session/state-machine error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Transmission policy error.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] peercrypt_crypto::CryptoError),

    /// Underlying transport I/O error.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fatal, operator-reportable condition with a structured reason
    /// code (spec §7: "reported to the operator with structured reason
    /// codes").
    #[error("fatal: {reason:?}: {detail}")]
    Fatal {
        /// Machine-readable reason code.
        reason: ReasonCode,
        /// Human-readable detail for logs.
        detail: String,
    },
}

impl CoreError {
    /// Build a [`CoreError::Fatal`] with the given reason code.
    #[must_use]
    pub fn fatal(reason: ReasonCode, detail: impl Into<String>) -> Self {
        Self::Fatal {
            reason,
            detail: detail.into(),
        }
    }
}

/// Structured reason codes for fatal, operator-visible failures (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    /// Unknown frame version, unknown type, or length exceeding buffer.
    ProtocolViolation,
    /// File-level checksum mismatch at FIN.
    IntegrityMismatch,
    /// `connection_timeout` elapsed without completing the handshake.
    HandshakeTimeout,
    /// MAC-failure rate exceeded the configured threshold.
    MacFailureThreshold,
    /// Both RTO and dup-ACK detection are disabled and the session
    /// stalled past `max_RTO` (spec §9 open question).
    StalledNoRetransmit,
    /// Cancelled by operator or coordinator shutdown.
    Cancelled,
}

/// Frame-level errors (spec §4.2 validation order: version, length, CRC, HMAC).
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame shorter than the 20-byte fixed header.
    #[error("frame too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum required length.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Buffer holds fewer bytes than the full frame needs; caller must
    /// buffer without consuming source bytes (spec §4.2).
    #[error("incomplete frame: need {needed} more bytes")]
    Incomplete {
        /// Additional bytes required before the frame can be parsed.
        needed: usize,
    },

    /// Version byte does not match the supported set.
    #[error("unsupported frame version: 0x{0:02X}")]
    UnsupportedVersion(u8),

    /// Unrecognized frame type byte.
    #[error("invalid frame type: 0x{0:02X}")]
    InvalidFrameType(u8),

    /// Declared payload length exceeds the receive buffer remainder.
    #[error("payload length {declared} exceeds buffer remainder {remaining}")]
    PayloadOverflow {
        /// Length declared in the frame header.
        declared: usize,
        /// Bytes actually available after the header.
        remaining: usize,
    },

    /// CRC-16/IBM mismatch.
    #[error("CRC mismatch: expected 0x{expected:04X}, computed 0x{computed:04X}")]
    CrcMismatch {
        /// CRC carried in the frame.
        expected: u16,
        /// CRC computed over the received bytes.
        computed: u16,
    },

    /// HMAC authentication token mismatch.
    #[error("frame authentication failed")]
    AuthenticationFailed,
}

/// Session-level (state machine) errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested transition is not valid from the current state
    /// (spec §4.4).
    #[error("invalid transition: {event} is not valid from state {from:?}")]
    InvalidTransition {
        /// The state the session was in.
        from: crate::state_machine::TransferState,
        /// A description of the attempted event.
        event: &'static str,
    },

    /// Handshake did not complete within `connection_timeout`.
    #[error("connection timeout")]
    Timeout,

    /// File-level checksum did not match at FIN.
    #[error("integrity check failed")]
    IntegrityMismatch,

    /// The peer sent an RST or ERROR frame.
    #[error("session reset by peer: {0}")]
    ResetByPeer(String),

    /// The outstanding-ACK set or out-of-order buffer overflowed its
    /// configured bound.
    #[error("buffer overflow: capacity {capacity}")]
    BufferOverflow {
        /// Configured capacity that was exceeded.
        capacity: usize,
    },
}

/// Transmission-policy errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A stalled session with both RTO and dup-ACK detection disabled
    /// (spec §9 open question resolution).
    #[error("session stalled with retransmission disabled")]
    StalledNoRetransmit,

    /// Token bucket parameters were invalid (zero capacity or rate).
    #[error("invalid token bucket parameters")]
    InvalidTokenBucketParams,

    /// A parallel worker's range does not evenly partition the file.
    #[error("invalid parallel range assignment")]
    InvalidRangeAssignment,
}
