//! Control message codec (spec §6.3).
//!
//! A fixed 16-byte header followed by a JSON parameter blob. Used for
//! out-of-band negotiation that doesn't fit the DATA/ACK fast path:
//! mode switches, file metadata announcements, and congestion
//! parameter overrides.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Size of the fixed control header, in bytes.
pub const CONTROL_HEADER_SIZE: usize = 16;

/// Control message type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlType {
    /// Switch the active transmission policy.
    ModeChange = 0x01,
    /// Announce file metadata ahead of a transfer.
    FileInfo = 0x02,
    /// Override congestion-control parameters mid-session.
    CongestionParams = 0x03,
    /// Structured error report.
    Error = 0xFF,
}

impl TryFrom<u8> for ControlType {
    type Error = ControlError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::ModeChange),
            0x02 => Ok(Self::FileInfo),
            0x03 => Ok(Self::CongestionParams),
            0xFF => Ok(Self::Error),
            other => Err(ControlError::UnknownType(other)),
        }
    }
}

/// Control codec errors.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Message shorter than the 16-byte header.
    #[error("control message too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum required length.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Unrecognized type byte.
    #[error("unknown control type: 0x{0:02X}")]
    UnknownType(u8),

    /// Declared parameter length does not match what was actually supplied.
    #[error("parameter length mismatch: declared {declared}, found {found}")]
    LengthMismatch {
        /// Declared length.
        declared: usize,
        /// Bytes actually present.
        found: usize,
    },

    /// The parameter blob was not valid JSON, or didn't match the
    /// caller's requested type.
    #[error("invalid parameter JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Version byte for control messages; shares the frame codec's supported set.
pub const CONTROL_VERSION: u8 = crate::frame::SUPPORTED_VERSION;

/// A decoded control message: header fields plus the raw JSON parameter blob.
#[derive(Debug, Clone)]
pub struct ControlMessage {
    /// Message type.
    pub control_type: ControlType,
    /// Sender-assigned message id, for request/response correlation.
    pub message_id: u16,
    /// Milliseconds since session start.
    pub timestamp_ms: u32,
    /// Reserved flag bits, currently unused but carried verbatim.
    pub flags: u16,
    /// The transmission mode this message pertains to, where applicable.
    pub mode: u16,
    /// Raw JSON parameter bytes.
    pub parameters: Vec<u8>,
}

impl ControlMessage {
    /// Build a control message by serializing `params` to JSON.
    pub fn new<T: Serialize>(
        control_type: ControlType,
        message_id: u16,
        timestamp_ms: u32,
        mode: u16,
        params: &T,
    ) -> Result<Self, ControlError> {
        Ok(Self {
            control_type,
            message_id,
            timestamp_ms,
            flags: 0,
            mode,
            parameters: serde_json::to_vec(params)?,
        })
    }

    /// Deserialize the parameter blob as `T`.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T, ControlError> {
        Ok(serde_json::from_slice(&self.parameters)?)
    }

    /// Encode the full control message (header + parameter blob).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CONTROL_HEADER_SIZE + self.parameters.len());
        buf.push(CONTROL_VERSION);
        buf.push(self.control_type as u8);
        buf.extend_from_slice(&self.message_id.to_be_bytes());
        buf.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        buf.extend_from_slice(&self.flags.to_be_bytes());
        buf.extend_from_slice(&self.mode.to_be_bytes());
        buf.extend_from_slice(&(self.parameters.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.parameters);
        buf
    }

    /// Decode a control message from `data`, returning it and the
    /// number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), ControlError> {
        if data.len() < CONTROL_HEADER_SIZE {
            return Err(ControlError::TooShort {
                expected: CONTROL_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let control_type = ControlType::try_from(data[1])?;
        let message_id = u16::from_be_bytes([data[2], data[3]]);
        let timestamp_ms = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let flags = u16::from_be_bytes([data[8], data[9]]);
        let mode = u16::from_be_bytes([data[10], data[11]]);
        let param_len = u32::from_be_bytes([data[12], data[13], data[14], data[15]]) as usize;

        let remaining = data.len() - CONTROL_HEADER_SIZE;
        if remaining < param_len {
            return Err(ControlError::LengthMismatch {
                declared: param_len,
                found: remaining,
            });
        }
        let parameters = data[CONTROL_HEADER_SIZE..CONTROL_HEADER_SIZE + param_len].to_vec();
        Ok((
            Self {
                control_type,
                message_id,
                timestamp_ms,
                flags,
                mode,
                parameters,
            },
            CONTROL_HEADER_SIZE + param_len,
        ))
    }
}
