//! Transfer state machine (component D, spec §4.4).
//!
//! ```text
//! IDLE --initiate_send--> CONNECTING --ack_of_init--> TRANSFER
//! CONNECTING --timeout/rst--> ERROR
//! TRANSFER --last_chunk_acked--> VALIDATING
//! TRANSFER --error_frame/unrecoverable_timeout--> ERROR
//! VALIDATING --validation_ok--> COMPLETED
//! VALIDATING --validation_failed--> ERROR
//! ERROR --retry--> CONNECTING
//! COMPLETED --new_transfer--> CONNECTING
//! ```

use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// The transfer session lifecycle state (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferState {
    /// No transfer in progress.
    Idle,
    /// INIT sent, awaiting ACK-of-INIT.
    Connecting,
    /// Streaming DATA frames under the active policy.
    Transfer,
    /// FIN sent/received, file-level checksum being verified.
    Validating,
    /// Transfer finished successfully.
    Completed,
    /// Transfer failed fatally.
    Error,
}

/// Events that drive [`TransferState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// Operator initiated a send.
    InitiateSend,
    /// ACK-of-INIT arrived.
    AckOfInit,
    /// The handshake timed out, or an RST arrived while connecting.
    ConnectTimeoutOrReset,
    /// The last chunk's cumulative ACK arrived.
    LastChunkAcked,
    /// An ERROR frame arrived, or the session stalled unrecoverably.
    FatalDuringTransfer,
    /// File-level checksum matched.
    ValidationSucceeded,
    /// File-level checksum did not match.
    ValidationFailed,
    /// Operator or automatic retry from ERROR.
    Retry,
    /// A new transfer was initiated from COMPLETED.
    NewTransfer,
}

impl TransferState {
    /// Apply `event`, returning the next state or an error if the
    /// transition is not valid from the current state.
    pub fn apply(self, event: TransferEvent) -> Result<Self, SessionError> {
        use TransferEvent as E;
        use TransferState as S;

        let next = match (self, event) {
            (S::Idle, E::InitiateSend) => S::Connecting,
            (S::Connecting, E::AckOfInit) => S::Transfer,
            (S::Connecting, E::ConnectTimeoutOrReset) => S::Error,
            (S::Transfer, E::LastChunkAcked) => S::Validating,
            (S::Transfer, E::FatalDuringTransfer) => S::Error,
            (S::Validating, E::ValidationSucceeded) => S::Completed,
            (S::Validating, E::ValidationFailed) => S::Error,
            (S::Error, E::Retry) => S::Connecting,
            (S::Completed, E::NewTransfer) => S::Connecting,
            _ => {
                return Err(SessionError::InvalidTransition {
                    from: self,
                    event: event.label(),
                })
            }
        };
        Ok(next)
    }

    /// Whether this state is terminal from the operator's point of
    /// view, though both can still be left by a new initiation (spec §4.4).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl TransferEvent {
    fn label(self) -> &'static str {
        match self {
            Self::InitiateSend => "initiate_send",
            Self::AckOfInit => "ack_of_init",
            Self::ConnectTimeoutOrReset => "connect_timeout_or_reset",
            Self::LastChunkAcked => "last_chunk_acked",
            Self::FatalDuringTransfer => "fatal_during_transfer",
            Self::ValidationSucceeded => "validation_succeeded",
            Self::ValidationFailed => "validation_failed",
            Self::Retry => "retry",
            Self::NewTransfer => "new_transfer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransferEvent as E;
    use TransferState as S;

    #[test]
    fn happy_path() {
        let s = S::Idle;
        let s = s.apply(E::InitiateSend).unwrap();
        assert_eq!(s, S::Connecting);
        let s = s.apply(E::AckOfInit).unwrap();
        assert_eq!(s, S::Transfer);
        let s = s.apply(E::LastChunkAcked).unwrap();
        assert_eq!(s, S::Validating);
        let s = s.apply(E::ValidationSucceeded).unwrap();
        assert_eq!(s, S::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn error_then_retry_returns_to_connecting() {
        let s = S::Transfer.apply(E::FatalDuringTransfer).unwrap();
        assert_eq!(s, S::Error);
        let s = s.apply(E::Retry).unwrap();
        assert_eq!(s, S::Connecting);
    }

    #[test]
    fn completed_can_restart() {
        let s = S::Completed.apply(E::NewTransfer).unwrap();
        assert_eq!(s, S::Connecting);
    }

    #[test]
    fn invalid_transition_rejected() {
        let err = S::Idle.apply(E::AckOfInit).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { from: S::Idle, .. }));
    }

    #[test]
    fn validation_failure_is_fatal() {
        let s = S::Validating.apply(E::ValidationFailed).unwrap();
        assert_eq!(s, S::Error);
    }
}
