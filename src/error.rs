//! Error types for sealing and opening master keys.
//!
//! Messages are deliberately generic: none of them may carry the PIN,
//! derived key or plaintext.

use thiserror::Error;

/// Result type alias for pinseal operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Key derivation failed or its inputs were rejected.
    #[error("key derivation failed: {0}")]
    Derivation(String),

    /// Encryption could not run (random source, plaintext size).
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The payload is too short or structurally invalid.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Tag verification failed. Wrong PIN and tampering are not told apart.
    #[error("invalid PIN or corrupted payload")]
    AuthenticationFailed,

    /// The medium failed; passed through unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures of the medium the payload is written to or read from.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no payload found on medium")]
    NotFound,

    /// The medium does not support the required capability.
    #[error("medium not supported: {0}")]
    Unsupported(String),

    #[error("payload of {needed} bytes exceeds medium capacity of {available} bytes")]
    Capacity { needed: usize, available: usize },

    #[error("medium i/o error: {0}")]
    Io(#[from] std::io::Error),
}
