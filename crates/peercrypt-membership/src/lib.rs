//! # PeerCrypt Membership
//!
//! Gossip-based peer membership for the PeerCrypt protocol.
//!
//! This crate provides:
//! - [`peer::PeerRecord`]: per-peer reliability scoring and RTT smoothing
//! - [`table::PeerTable`]: the shared, read-mostly peer table
//! - [`wire`]: the 12-byte gossip header and 24-byte peer entry codec
//! - [`gossip`]: gossip-round peer selection and sampling
//! - [`health`]: PING/PONG health checks and connection retry/backoff
//!
//! Sessions elsewhere in the system address peers only by [`peer::PeerKey`];
//! this crate owns the table, avoiding the cyclic peer/session ownership
//! the source exhibited (spec §9).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod gossip;
pub mod health;
pub mod peer;
pub mod table;
pub mod wire;

pub use error::MembershipError;
pub use gossip::GossipConfig;
pub use health::Backoff;
pub use peer::{InteractionOutcome, NodeId, PeerKey, PeerRecord};
pub use table::PeerTable;
