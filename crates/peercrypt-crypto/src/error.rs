//! Error types for the PeerCrypt crypto envelope.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// HMAC verification failed; the frame or payload must be dropped
    /// by the caller without further processing.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// CBC padding was malformed after a successful MAC check, which
    /// should not happen for honestly-generated ciphertext.
    #[error("invalid padding")]
    InvalidPadding,

    /// Input shorter than the minimum envelope size (IV + MAC).
    #[error("sealed input too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum required length.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Key derivation was asked for zero iterations or an empty salt.
    #[error("invalid key derivation parameters")]
    InvalidKdfParams,
}
