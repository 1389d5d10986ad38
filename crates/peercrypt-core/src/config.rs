//! Ambient configuration (spec §6.5).
//!
//! Every recognized option is a typed field with the spec's default —
//! the "dynamic option parsing" redesign flag (spec §9) applied
//! throughout, not only at the transmission-policy boundary.

use crate::chunker::{DEFAULT_CHUNK_SIZE, DEFAULT_MTU_FLOOR};
use crate::congestion::{DEFAULT_MAX_WINDOW, DEFAULT_MIN_WINDOW};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The default transmission policy selected when a session doesn't
/// name one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultMode {
    /// Unconstrained back-to-back streaming (§4.5.1).
    Normal,
    /// Leaky-bucket rate limiting (§4.5.2).
    TokenBucket,
    /// AIMD congestion control (§4.5.3).
    Aimd,
    /// Weighted priority scheduling (§4.5.4).
    Qos,
    /// Multi-worker range split (§4.5.5).
    Parallel,
    /// One-to-many fan-out (§4.5.6).
    Multicast,
}

/// Recognized configuration options (spec §6.5), with the spec's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transmission policy used when none is specified.
    pub default_mode: DefaultMode,
    /// Interval between gossip rounds.
    #[serde(with = "duration_secs_f64")]
    pub gossip_interval: Duration,
    /// Disable gossip dissemination entirely.
    pub disable_gossip: bool,
    /// Initial AIMD congestion window, in bytes.
    pub aimd_window: u32,
    /// Minimum AIMD congestion window, in bytes.
    pub aimd_min_window: u32,
    /// Maximum AIMD congestion window, in bytes.
    pub aimd_max_window: u32,
    /// Worker count for the Parallel policy.
    pub parallel_threads: usize,
    /// Retry ceiling for connection attempts.
    pub max_retries: u32,
    /// Handshake timeout.
    #[serde(with = "duration_secs_f64")]
    pub connection_timeout: Duration,
    /// Interval between PING health checks.
    #[serde(with = "duration_secs_f64")]
    pub health_check_interval: Duration,
    /// Negotiated chunk size, in bytes.
    pub chunk_size: u32,
    /// Minimum acceptable path MTU.
    pub mtu_floor: u32,
    /// Triple-duplicate-ACK threshold (spec §9: configurable, not fixed).
    pub dup_ack_threshold: u32,
    /// RTO floor.
    #[serde(with = "duration_secs_f64")]
    pub min_rto: Duration,
    /// RTO ceiling.
    #[serde(with = "duration_secs_f64")]
    pub max_rto: Duration,
    /// Normal policy's bounded sliding window of outstanding ACKs.
    pub normal_window: usize,
    /// Token-bucket capacity, in bytes.
    pub token_bucket_capacity: u64,
    /// Token-bucket fill rate, in bytes/second.
    pub token_bucket_rate: u64,
    /// QoS scheduling weights for (normal, high, highest).
    pub qos_weights: (u32, u32, u32),
    /// Bounded out-of-order receive buffer capacity, in chunks.
    pub reorder_buffer_capacity: usize,
    /// MAC-failure rate threshold before a session is torn down.
    pub mac_failure_threshold: u32,
    /// Grace period to drain ACKs after cancellation before closing.
    #[serde(with = "duration_secs_f64")]
    pub cancellation_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_mode: DefaultMode::Normal,
            gossip_interval: Duration::from_secs(5),
            disable_gossip: false,
            aimd_window: 16 * 1024,
            aimd_min_window: DEFAULT_MIN_WINDOW,
            aimd_max_window: DEFAULT_MAX_WINDOW,
            parallel_threads: 4,
            max_retries: 3,
            connection_timeout: Duration::from_secs_f64(3.0),
            health_check_interval: Duration::from_secs_f64(10.0),
            chunk_size: DEFAULT_CHUNK_SIZE,
            mtu_floor: DEFAULT_MTU_FLOOR,
            dup_ack_threshold: 3,
            min_rto: Duration::from_millis(200),
            max_rto: Duration::from_secs(60),
            normal_window: 8,
            token_bucket_capacity: 4096,
            token_bucket_rate: 1024,
            qos_weights: (1, 2, 3),
            reorder_buffer_capacity: 256,
            mac_failure_threshold: 16,
            cancellation_grace: Duration::from_secs(1),
        }
    }
}

mod duration_secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
