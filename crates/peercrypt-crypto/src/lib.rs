//! # PeerCrypt Crypto
//!
//! Authenticated encryption envelope for the PeerCrypt protocol.
//!
//! This crate provides:
//! - Encrypt-then-MAC sealing of chunk payloads and control frames
//!   (AES-256-CBC + HMAC-SHA-256, spec §4.1)
//! - PBKDF2-HMAC-SHA256 session key derivation with a per-session salt
//! - Truncated authentication tokens for frame headers (spec §6.1)
//!
//! It knows nothing about frames, sessions, or transmission policy —
//! those live in `peercrypt-core`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constant_time;
pub mod envelope;
pub mod error;
pub mod kdf;

pub use constant_time::ct_eq;
pub use envelope::{
    open, seal, truncated_tag, verify_truncated_tag, IV_SIZE, MAC_SIZE, MIN_SEALED_SIZE,
    TRUNCATED_TAG_SIZE,
};
pub use error::CryptoError;
pub use kdf::{SessionKey, MIN_PBKDF2_ITERATIONS, SALT_SIZE};
