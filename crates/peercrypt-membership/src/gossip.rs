//! Gossip rounds: peer selection, sampling, and merge (spec §4.3).

use crate::peer::{PeerKey, PeerRecord};
use crate::wire::PeerEntry;
use rand::seq::SliceRandom;
use rand::Rng;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Default interval between gossip rounds.
pub const DEFAULT_GOSSIP_INTERVAL: Duration = Duration::from_secs(5);

/// Default fanout: number of peers a gossip round targets.
pub const DEFAULT_FANOUT: usize = 3;

/// Default bounded sample size included in a PEERS message.
pub const DEFAULT_SAMPLE_SIZE: usize = 32;

/// Gossip round tunables (spec §6.5: `gossip_interval`).
#[derive(Debug, Clone, Copy)]
pub struct GossipConfig {
    /// Time between scheduled gossip rounds.
    pub interval: Duration,
    /// Number of random peers targeted per round (`k`).
    pub fanout: usize,
    /// Maximum number of entries included in a PEERS sample.
    pub sample_size: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_GOSSIP_INTERVAL,
            fanout: DEFAULT_FANOUT,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// Select up to `fanout` random peers from `view` to gossip with this round.
pub fn select_targets<R: Rng>(view: &[PeerRecord], fanout: usize, rng: &mut R) -> Vec<PeerKey> {
    let mut keys: Vec<PeerKey> = view.iter().map(PeerRecord::key).collect();
    keys.shuffle(rng);
    keys.truncate(fanout);
    keys
}

/// Build a bounded PEERS sample, preferring the highest-reliability
/// and most-recently-seen entries (spec §4.3).
#[must_use]
pub fn build_sample(view: &[PeerRecord], sample_size: usize) -> Vec<PeerEntry> {
    let mut ranked: Vec<&PeerRecord> = view.iter().collect();
    ranked.sort_by(|a, b| {
        b.reliability()
            .partial_cmp(&a.reliability())
            .unwrap()
            .then_with(|| a.age().cmp(&b.age()))
    });
    ranked
        .into_iter()
        .take(sample_size)
        .filter_map(|record| to_entry(record))
        .collect()
}

fn to_entry(record: &PeerRecord) -> Option<PeerEntry> {
    let key = record.key();
    let IpAddr::V4(v4) = key.address else {
        return None;
    };
    Some(PeerEntry::from_ipv4(
        key.node_id,
        v4,
        key.port,
        record.reliability(),
        record.age().as_millis().min(u128::from(u32::MAX)) as u32,
    ))
}

/// Turn a received [`PeerEntry`] back into a dialable key.
#[must_use]
pub fn entry_to_key(entry: &PeerEntry) -> PeerKey {
    let addr = if let Some(v4) = entry.ip.to_ipv4_mapped() {
        IpAddr::V4(v4)
    } else {
        IpAddr::V6(entry.ip)
    };
    PeerKey::new(entry.node_id, SocketAddr::new(addr, entry.port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::PeerKey as Key;
    use rand::rngs::mock::StepRng;

    fn records(n: u32) -> Vec<PeerRecord> {
        (0..n)
            .map(|i| {
                PeerRecord::new(Key::new(
                    i,
                    SocketAddr::from(([127, 0, 0, 1], 9000 + i as u16)),
                ))
            })
            .collect()
    }

    #[test]
    fn select_targets_respects_fanout() {
        let view = records(10);
        let mut rng = StepRng::new(0, 1);
        let targets = select_targets(&view, 3, &mut rng);
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn select_targets_caps_at_view_size() {
        let view = records(2);
        let mut rng = StepRng::new(0, 1);
        let targets = select_targets(&view, 5, &mut rng);
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn build_sample_caps_at_sample_size() {
        let view = records(50);
        let sample = build_sample(&view, 32);
        assert_eq!(sample.len(), 32);
    }

    #[test]
    fn entry_round_trips_to_key() {
        let view = records(1);
        let sample = build_sample(&view, 10);
        let key = entry_to_key(&sample[0]);
        assert_eq!(key, view[0].key());
    }
}
