//! Gossip wire format (spec §6.2).
//!
//! ```text
//! 12-byte header: version(1) type(1) reserved(2) source_node_id(4) timestamp(4)
//! followed for PEERS by: peer_count(2) reserved(2) then peer_count * 24-byte entries
//! entry: node_id(4) ip(16, IPv4-mapped IPv6) port(2) reliability Q0.16(2) last_seen_ms(4) reserved(4)
//! ```
//!
//! PING/PONG correlate a health check via a nonce; the wire format has
//! no dedicated nonce field, so the 4-byte `timestamp` slot doubles as
//! the correlation token for those two message types (spec §4.3 leaves
//! the wire placement open — see DESIGN.md).

use crate::error::MembershipError;
use crate::peer::NodeId;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Size of the fixed gossip header, in bytes.
pub const HEADER_SIZE: usize = 12;

/// Size of the `peer_count`/`reserved` block preceding PEERS entries.
pub const PEERS_PREFIX_SIZE: usize = 4;

/// Size of a single peer entry, in bytes.
pub const ENTRY_SIZE: usize = 24;

/// Currently supported gossip wire version.
pub const GOSSIP_VERSION: u8 = 0x01;

/// Gossip message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GossipType {
    /// Introduce a new member to the network.
    Hello = 0x01,
    /// A sample of known peers.
    Peers = 0x02,
    /// Health-check request carrying a correlation nonce.
    Ping = 0x03,
    /// Health-check reply echoing the PING's nonce.
    Pong = 0x04,
    /// Graceful departure notice.
    Leave = 0x05,
}

impl TryFrom<u8> for GossipType {
    type Error = MembershipError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Hello),
            0x02 => Ok(Self::Peers),
            0x03 => Ok(Self::Ping),
            0x04 => Ok(Self::Pong),
            0x05 => Ok(Self::Leave),
            other => Err(MembershipError::UnknownMessageType(other)),
        }
    }
}

/// Parsed gossip header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GossipHeader {
    /// Message type.
    pub message_type: GossipType,
    /// Sender's node id.
    pub source_node_id: NodeId,
    /// For HELLO/PEERS/LEAVE, milliseconds since the sender's session
    /// start, used to smooth RTT. For PING/PONG, the correlation nonce.
    pub timestamp_or_nonce: u32,
}

impl GossipHeader {
    /// Encode the 12-byte header.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = GOSSIP_VERSION;
        buf[1] = self.message_type as u8;
        // bytes [2, 4) are reserved, left zero
        buf[4..8].copy_from_slice(&self.source_node_id.to_be_bytes());
        buf[8..12].copy_from_slice(&self.timestamp_or_nonce.to_be_bytes());
        buf
    }

    /// Decode the 12-byte header, failing if the version is
    /// unsupported or the type byte is unrecognized.
    pub fn decode(data: &[u8]) -> Result<Self, MembershipError> {
        if data.len() < HEADER_SIZE {
            return Err(MembershipError::TooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[0] != GOSSIP_VERSION {
            return Err(MembershipError::UnsupportedVersion(data[0]));
        }
        let message_type = GossipType::try_from(data[1])?;
        let source_node_id = u32::from_be_bytes(data[4..8].try_into().unwrap());
        let timestamp_or_nonce = u32::from_be_bytes(data[8..12].try_into().unwrap());
        Ok(Self {
            message_type,
            source_node_id,
            timestamp_or_nonce,
        })
    }
}

/// A single peer entry carried in a PEERS message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerEntry {
    /// The peer's node id.
    pub node_id: NodeId,
    /// The peer's IPv6 (or IPv4-mapped) address.
    pub ip: Ipv6Addr,
    /// The peer's port.
    pub port: u16,
    /// Reliability score as Q0.16 fixed point in `[0.0, 1.0]`.
    pub reliability_q16: u16,
    /// Milliseconds since the sender last heard from this peer.
    pub last_seen_ms: u32,
}

impl PeerEntry {
    /// Convert a floating-point reliability in `[0.0, 1.0]` to Q0.16.
    #[must_use]
    pub fn reliability_from_f64(r: f64) -> u16 {
        (r.clamp(0.0, 1.0) * f64::from(u16::MAX)).round() as u16
    }

    /// Convert a Q0.16 reliability back to a float in `[0.0, 1.0]`.
    #[must_use]
    pub fn reliability_as_f64(self) -> f64 {
        f64::from(self.reliability_q16) / f64::from(u16::MAX)
    }

    /// Build an entry for an IPv4 peer, mapping the address into
    /// IPv4-mapped IPv6 form as the wire format requires.
    #[must_use]
    pub fn from_ipv4(node_id: NodeId, addr: Ipv4Addr, port: u16, reliability: f64, last_seen_ms: u32) -> Self {
        Self {
            node_id,
            ip: addr.to_ipv6_mapped(),
            port,
            reliability_q16: Self::reliability_from_f64(reliability),
            last_seen_ms,
        }
    }

    /// Encode a single 24-byte entry.
    #[must_use]
    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[0..4].copy_from_slice(&self.node_id.to_be_bytes());
        buf[4..20].copy_from_slice(&self.ip.octets());
        buf[20..22].copy_from_slice(&self.port.to_be_bytes());
        buf[22..24].copy_from_slice(&self.reliability_q16.to_be_bytes());
        // last_seen_ms and reserved are appended by the caller in encode_peers
        buf
    }

    fn decode(data: &[u8]) -> Self {
        let node_id = u32::from_be_bytes(data[0..4].try_into().unwrap());
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&data[4..20]);
        let ip = Ipv6Addr::from(octets);
        let port = u16::from_be_bytes(data[20..22].try_into().unwrap());
        let reliability_q16 = u16::from_be_bytes(data[22..24].try_into().unwrap());
        Self {
            node_id,
            ip,
            port,
            reliability_q16,
            last_seen_ms: 0,
        }
    }
}

/// Encode a PEERS message: header + `peer_count` + reserved + entries.
///
/// Each entry is 24 bytes per spec §6.2 (`node_id(4) ip(16) port(2)
/// reliability(2) last_seen_ms(4) reserved(4)`); `last_seen_ms` is
/// appended after the 20-byte prefix [`PeerEntry::encode`] produces.
#[must_use]
pub fn encode_peers(header: &GossipHeader, entries: &[PeerEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + PEERS_PREFIX_SIZE + entries.len() * ENTRY_SIZE);
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0u8; 2]); // reserved
    for entry in entries {
        out.extend_from_slice(&entry.node_id.to_be_bytes());
        out.extend_from_slice(&entry.ip.octets());
        out.extend_from_slice(&entry.port.to_be_bytes());
        out.extend_from_slice(&entry.reliability_q16.to_be_bytes());
        out.extend_from_slice(&entry.last_seen_ms.to_be_bytes());
        out.extend_from_slice(&[0u8; 4]); // reserved
    }
    out
}

/// Decode a PEERS message body (the bytes following the 12-byte header).
pub fn decode_peers(body: &[u8]) -> Result<Vec<PeerEntry>, MembershipError> {
    if body.len() < PEERS_PREFIX_SIZE {
        return Err(MembershipError::TooShort {
            expected: PEERS_PREFIX_SIZE,
            actual: body.len(),
        });
    }
    let declared = u16::from_be_bytes(body[0..2].try_into().unwrap()) as usize;
    let entries_bytes = &body[PEERS_PREFIX_SIZE..];
    if entries_bytes.len() < declared * ENTRY_SIZE {
        return Err(MembershipError::TooShort {
            expected: declared * ENTRY_SIZE,
            actual: entries_bytes.len(),
        });
    }
    let found = entries_bytes.len() / ENTRY_SIZE;
    if found < declared {
        return Err(MembershipError::PeerCountMismatch { declared, found });
    }
    let mut out = Vec::with_capacity(declared);
    for i in 0..declared {
        let chunk = &entries_bytes[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE];
        let mut entry = PeerEntry::decode(chunk);
        entry.last_seen_ms = u32::from_be_bytes(chunk[20..24].try_into().unwrap());
        out.push(entry);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let h = GossipHeader {
            message_type: GossipType::Ping,
            source_node_id: 0xdead_beef,
            timestamp_or_nonce: 0x1234_5678,
        };
        let encoded = h.encode();
        let decoded = GossipHeader::decode(&encoded).unwrap();
        assert_eq!(h, decoded);
    }

    #[test]
    fn peers_round_trip() {
        let header = GossipHeader {
            message_type: GossipType::Peers,
            source_node_id: 1,
            timestamp_or_nonce: 1000,
        };
        let entries = vec![
            PeerEntry::from_ipv4(2, Ipv4Addr::new(10, 0, 0, 1), 4000, 0.95, 500),
            PeerEntry::from_ipv4(3, Ipv4Addr::new(10, 0, 0, 2), 4001, 0.10, 900),
        ];
        let encoded = encode_peers(&header, &entries);
        let decoded_header = GossipHeader::decode(&encoded).unwrap();
        assert_eq!(decoded_header, header);
        let decoded_entries = decode_peers(&encoded[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded_entries.len(), 2);
        assert_eq!(decoded_entries[0].node_id, 2);
        assert!((decoded_entries[0].reliability_as_f64() - 0.95).abs() < 1e-3);
        assert_eq!(decoded_entries[1].last_seen_ms, 900);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut encoded = GossipHeader {
            message_type: GossipType::Hello,
            source_node_id: 1,
            timestamp_or_nonce: 0,
        }
        .encode();
        encoded[0] = 0x02;
        assert!(matches!(
            GossipHeader::decode(&encoded),
            Err(MembershipError::UnsupportedVersion(0x02))
        ));
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(matches!(
            GossipHeader::decode(&[0x01, 0x01]),
            Err(MembershipError::TooShort { .. })
        ));
    }
}
