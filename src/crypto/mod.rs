//! Cryptographic primitives for sealing master keys.
//!
//! Provides PIN-based key derivation and the AES-256-GCM cipher.

pub mod aead;
pub mod kdf;

pub use kdf::{KdfParams, KeyDeriver};

/// Length of the PBKDF2 salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the AES-GCM nonce (12 bytes).
pub const NONCE_LEN: usize = 12;
/// Length of the derived key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the GCM authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
/// Largest master key accepted for sealing.
pub const MAX_MASTER_KEY_LEN: usize = 1024;
