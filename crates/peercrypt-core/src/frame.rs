//! Frame codec (component B, spec §4.2, §6.1).
//!
//! Encodes and decodes the fixed 20-byte frame header shared by DATA,
//! ACK, and control frames, all in network byte order. Validation
//! proceeds in the order the spec mandates: version, length, CRC,
//! then HMAC. The codec is pure and deterministic: the same bytes
//! always parse to the same structured frame.
//!
//! Header layout resolves a contradiction in the distilled spec (see
//! DESIGN.md): it documents both a 20-byte fixed header *and* a
//! truncated-HMAC field of width 8 starting at offset 14, which would
//! require 22 bytes. This codec keeps the header at 20 bytes and
//! narrows the truncated tag to 6 bytes (`FRAME_AUTH_TAG_SIZE`), the
//! leading 6 bytes of the 8-byte token [`peercrypt_crypto::truncated_tag`]
//! produces.

use crate::crc16::crc16_ibm;
use crate::error::FrameError;
use peercrypt_crypto::SessionKey;

/// Size of the fixed frame header, in bytes.
pub const FRAME_HEADER_SIZE: usize = 20;

/// Size of the truncated authentication tag carried in the header.
pub const FRAME_AUTH_TAG_SIZE: usize = 6;

/// Currently supported wire version.
pub const SUPPORTED_VERSION: u8 = 0x01;

/// Frame type byte (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// File chunk payload.
    Data = 0x01,
    /// Cumulative acknowledgment.
    Ack = 0x02,
    /// Session/transfer initiation and negotiation.
    Init = 0x03,
    /// End of transfer, triggers file-level validation.
    Fin = 0x04,
    /// Abrupt session reset.
    Rst = 0x05,
    /// File metadata announcement.
    Metadata = 0x06,
    /// Fatal protocol/integrity error report.
    Error = 0x07,
    /// Pause sending.
    Pause = 0x08,
    /// Resume sending.
    Resume = 0x09,
}

impl TryFrom<u8> for FrameType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Data),
            0x02 => Ok(Self::Ack),
            0x03 => Ok(Self::Init),
            0x04 => Ok(Self::Fin),
            0x05 => Ok(Self::Rst),
            0x06 => Ok(Self::Metadata),
            0x07 => Ok(Self::Error),
            0x08 => Ok(Self::Pause),
            0x09 => Ok(Self::Resume),
            other => Err(FrameError::InvalidFrameType(other)),
        }
    }
}

/// Frame flag bits (spec §6.1, offset 12, width 2; bits 6-15 reserved).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u16);

impl FrameFlags {
    /// Payload is encrypted under the session's crypto envelope.
    pub const ENCRYPTED: u16 = 1 << 0;
    /// Payload is a fragment of a larger logical chunk.
    pub const FRAGMENTED: u16 = 1 << 1;
    /// Final fragment of a fragmented chunk.
    pub const LAST_FRAGMENT: u16 = 1 << 2;
    /// Frame should be scheduled ahead of normal-priority traffic.
    pub const HIGH_PRIORITY: u16 = 1 << 3;
    /// Receiver must emit an ACK for this frame.
    pub const REQUIRES_ACK: u16 = 1 << 4;
    /// Payload is compressed.
    pub const COMPRESSED: u16 = 1 << 5;

    /// Empty flag set.
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// Raw bit value.
    #[must_use]
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Set a flag bit, builder-style.
    #[must_use]
    pub fn with(mut self, bit: u16) -> Self {
        self.0 |= bit;
        self
    }

    /// Whether a flag bit is set.
    #[must_use]
    pub fn has(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    fn from_bits_truncated(bits: u16) -> Self {
        // Reserved bits 6-15 must be zero per spec; mask rather than reject
        // so forward-compatible senders don't fatally break old receivers.
        Self(bits & 0x003F)
    }
}

/// A decoded frame header plus its owned payload.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame type.
    pub frame_type: FrameType,
    /// Sequence number, wraps at 65536.
    pub sequence: u16,
    /// Milliseconds since session start.
    pub timestamp_ms: u32,
    /// Flag bits.
    pub flags: FrameFlags,
    /// Frame payload (ciphertext if `ENCRYPTED` is set).
    pub payload: Vec<u8>,
}

impl Frame {
    /// Encode this frame, computing the CRC and truncated HMAC over
    /// header-plus-payload.
    #[must_use]
    pub fn encode(&self, key: &SessionKey) -> Vec<u8> {
        let mut buf = vec![0u8; FRAME_HEADER_SIZE + self.payload.len()];
        buf[0] = SUPPORTED_VERSION;
        buf[1] = self.frame_type as u8;
        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp_ms.to_be_bytes());
        buf[8..10].copy_from_slice(&(self.payload.len() as u16).to_be_bytes());
        // CRC field (10..12) and auth tag field (14..20) start zeroed.
        buf[12..14].copy_from_slice(&self.flags.bits().to_be_bytes());
        buf[FRAME_HEADER_SIZE..].copy_from_slice(&self.payload);

        let crc = crc16_ibm(&crc_input(&buf));
        buf[10..12].copy_from_slice(&crc.to_be_bytes());

        let tag = peercrypt_crypto::truncated_tag(key, &auth_input(&buf));
        buf[14..14 + FRAME_AUTH_TAG_SIZE].copy_from_slice(&tag[..FRAME_AUTH_TAG_SIZE]);
        buf
    }

    /// Attempt to decode one frame from the front of `data`.
    ///
    /// Validation proceeds strictly in spec order: version, length,
    /// CRC, HMAC. On success returns the frame and the number of bytes
    /// consumed. Returns [`FrameError::Incomplete`] (not a hard error)
    /// when `data` holds a valid-looking but partial frame, so callers
    /// buffer rather than discard.
    pub fn decode(data: &[u8], key: &SessionKey) -> Result<(Self, usize), FrameError> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(FrameError::Incomplete {
                needed: FRAME_HEADER_SIZE - data.len(),
            });
        }

        if data[0] != SUPPORTED_VERSION {
            return Err(FrameError::UnsupportedVersion(data[0]));
        }

        let frame_type = FrameType::try_from(data[1])?;
        let sequence = u16::from_be_bytes([data[2], data[3]]);
        let timestamp_ms = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let payload_len = u16::from_be_bytes([data[8], data[9]]) as usize;
        let declared_crc = u16::from_be_bytes([data[10], data[11]]);
        let flags = FrameFlags::from_bits_truncated(u16::from_be_bytes([data[12], data[13]]));

        let total_len = FRAME_HEADER_SIZE + payload_len;
        if total_len > data.len() {
            // Could be a buffer/transport boundary rather than a hostile
            // frame; only reject outright if it overruns what the
            // receive buffer could ever hold (caller enforces that).
            return Err(FrameError::Incomplete {
                needed: total_len - data.len(),
            });
        }

        let frame_bytes = &data[..total_len];
        let computed_crc = crc16_ibm(&crc_input(frame_bytes));
        if computed_crc != declared_crc {
            return Err(FrameError::CrcMismatch {
                expected: declared_crc,
                computed: computed_crc,
            });
        }

        let received_tag = &frame_bytes[14..14 + FRAME_AUTH_TAG_SIZE];
        let expected_tag = peercrypt_crypto::truncated_tag(key, &auth_input(frame_bytes));
        if !peercrypt_crypto::ct_eq(&expected_tag[..FRAME_AUTH_TAG_SIZE], received_tag) {
            return Err(FrameError::AuthenticationFailed);
        }

        let payload = frame_bytes[FRAME_HEADER_SIZE..].to_vec();
        Ok((
            Self {
                frame_type,
                sequence,
                timestamp_ms,
                flags,
                payload,
            },
            total_len,
        ))
    }
}

/// Bytes covered by the CRC: the full frame with the CRC field itself
/// zeroed (it cannot authenticate itself) but the not-yet-computed
/// auth tag field included as zeros, matching what the sender had
/// written at CRC-computation time.
fn crc_input(frame: &[u8]) -> Vec<u8> {
    let mut copy = frame.to_vec();
    copy[10..12].fill(0);
    copy
}

/// Bytes covered by the truncated HMAC: the frame with both the CRC
/// and the auth-tag field zeroed, since the CRC is recomputed locally
/// and the tag cannot authenticate itself.
fn auth_input(frame: &[u8]) -> Vec<u8> {
    let mut copy = frame.to_vec();
    copy[10..12].fill(0);
    copy[14..14 + FRAME_AUTH_TAG_SIZE].fill(0);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use peercrypt_crypto::SessionKey;

    fn key() -> SessionKey {
        SessionKey::derive(b"secret", b"0123456789abcdef", 100_000).unwrap()
    }

    #[test]
    fn round_trip() {
        let key = key();
        let frame = Frame {
            frame_type: FrameType::Data,
            sequence: 42,
            timestamp_ms: 1234,
            flags: FrameFlags::new().with(FrameFlags::ENCRYPTED).with(FrameFlags::REQUIRES_ACK),
            payload: b"some ciphertext bytes".to_vec(),
        };
        let encoded = frame.encode(&key);
        assert_eq!(encoded.len(), FRAME_HEADER_SIZE + frame.payload.len());
        let (decoded, consumed) = Frame::decode(&encoded, &key).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.frame_type, FrameType::Data);
        assert_eq!(decoded.sequence, 42);
        assert_eq!(decoded.timestamp_ms, 1234);
        assert!(decoded.flags.has(FrameFlags::ENCRYPTED));
        assert!(decoded.flags.has(FrameFlags::REQUIRES_ACK));
        assert!(!decoded.flags.has(FrameFlags::COMPRESSED));
        assert_eq!(decoded.payload, frame.payload);
    }

    #[test]
    fn incomplete_frame_does_not_consume() {
        let key = key();
        let frame = Frame {
            frame_type: FrameType::Ack,
            sequence: 1,
            timestamp_ms: 0,
            flags: FrameFlags::new(),
            payload: vec![1, 2, 3, 4, 5],
        };
        let encoded = frame.encode(&key);
        let partial = &encoded[..encoded.len() - 1];
        assert!(matches!(
            Frame::decode(partial, &key),
            Err(FrameError::Incomplete { .. })
        ));
    }

    #[test]
    fn tampered_payload_fails_crc_before_hmac() {
        let key = key();
        let frame = Frame {
            frame_type: FrameType::Data,
            sequence: 7,
            timestamp_ms: 0,
            flags: FrameFlags::new(),
            payload: vec![0xAA; 16],
        };
        let mut encoded = frame.encode(&key);
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert!(matches!(
            Frame::decode(&encoded, &key),
            Err(FrameError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn wrong_key_fails_hmac() {
        let key = key();
        let other_key = SessionKey::derive(b"other secret", b"fedcba9876543210", 100_000).unwrap();
        let frame = Frame {
            frame_type: FrameType::Data,
            sequence: 1,
            timestamp_ms: 0,
            flags: FrameFlags::new(),
            payload: vec![1, 2, 3],
        };
        let encoded = frame.encode(&key);
        assert!(matches!(
            Frame::decode(&encoded, &other_key),
            Err(FrameError::AuthenticationFailed)
        ));
    }

    #[test]
    fn unsupported_version_rejected() {
        let key = key();
        let frame = Frame {
            frame_type: FrameType::Data,
            sequence: 0,
            timestamp_ms: 0,
            flags: FrameFlags::new(),
            payload: vec![],
        };
        let mut encoded = frame.encode(&key);
        encoded[0] = 0x02;
        assert!(matches!(
            Frame::decode(&encoded, &key),
            Err(FrameError::UnsupportedVersion(0x02))
        ));
    }
}
