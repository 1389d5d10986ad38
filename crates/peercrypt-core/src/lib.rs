//! # PeerCrypt Core
//!
//! Core protocol implementation for PeerCrypt: the wire codec, the
//! transfer state machine, the six transmission policies, the
//! receiver-side reassembly buffer, and the session coordinator that
//! ties them together over an arbitrary byte-stream transport.
//!
//! - [`frame`] / [`control`] / [`crc16`]: the wire formats (spec §6.1, §6.3)
//! - [`state_machine`]: the TRANSFER lifecycle (spec §4.4)
//! - [`congestion`]: AIMD window, RTT/RTO estimation, dup-ACK tracking (spec §4.5.3)
//! - [`policy`]: the six transmission policies (spec §4.5)
//! - [`chunker`]: file chunking and integrity (spec §3, §4.6)
//! - [`session`] / [`receiver`]: sender and receiver session state
//! - [`coordinator`]: drives a session end to end over a transport (spec §4.4, §7)
//! - [`config`]: ambient configuration (spec §6.5)
//! - [`stats`]: injectable transfer observability, in place of global counters
//! - [`transfer_log`]: append-only JSON-lines transfer history (spec §6.4)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod congestion;
pub mod control;
pub mod coordinator;
pub mod chunker;
pub mod crc16;
pub mod error;
pub mod frame;
pub mod policy;
pub mod receiver;
pub mod session;
pub mod state_machine;
pub mod stats;
pub mod transfer_log;
pub mod transport;

pub use config::Config;
pub use coordinator::{CancelHandle, ReceiverCoordinator, SenderCoordinator};
pub use error::{CoreError, PolicyError, ReasonCode};
pub use frame::{Frame, FrameFlags, FrameType};
pub use session::{FileMetadata, SenderSession};
pub use state_machine::{TransferEvent, TransferState};
