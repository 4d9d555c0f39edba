//! Seal a master key under a short PIN for storage on a passive medium.
//!
//! A 256-bit key is stretched from the PIN with PBKDF2-HMAC-SHA256 and a
//! fresh salt, the master key is sealed with AES-256-GCM, and the result is
//! framed as `salt ‖ nonce ‖ ciphertext‖tag`. The framed bytes can then be
//! moved through any [`Transport`], such as an NFC tag.
//!
//! ```no_run
//! use pinseal::{PayloadCodec, MemoryTransport, read_master_key, write_master_key};
//! use zeroize::Zeroizing;
//!
//! let codec = PayloadCodec::new();
//! let mut tag = MemoryTransport::new();
//!
//! write_master_key(&mut tag, &codec, &[1u8; 32], Zeroizing::new("1234".into()))?;
//! let master_key = read_master_key(&mut tag, &codec, Zeroizing::new("1234".into()))?;
//! assert_eq!(master_key.as_slice(), &[1u8; 32]);
//! # Ok::<(), pinseal::Error>(())
//! ```

mod codec;
mod crypto;
mod error;
mod format;
mod random;
mod transport;

pub use crate::codec::{PayloadCodec, inspect};
pub use crate::crypto::kdf::{LEGACY_ITERATIONS, MAX_ITERATIONS, MIN_ITERATIONS};
pub use crate::crypto::{
    KEY_LEN, KdfParams, KeyDeriver, MAX_MASTER_KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN,
};
pub use crate::error::{Error, Result, TransportError};
pub use crate::format::{
    Format, Payload, PayloadInfo, detect as detect_format, parse as parse_payload,
    serialize as serialize_payload,
};
pub use crate::random::{OsRandom, SecureRandom};
pub use crate::transport::ndef::{MIME_TYPE, decode_mime_record, encode_mime_record};
pub use crate::transport::{FileTransport, MemoryTransport, NdefTransport, Transport};

use tracing::info;
use zeroize::Zeroizing;

/// Seals `master_key` and writes the payload to `transport`.
///
/// # Errors
///
/// Any codec error, or the transport's own error unchanged.
pub fn write_master_key<T, R>(
    transport: &mut T,
    codec: &PayloadCodec<R>,
    master_key: &[u8],
    pin: Zeroizing<String>,
) -> Result<()>
where
    T: Transport + ?Sized,
    R: SecureRandom,
{
    let payload = codec.encrypt(master_key, pin)?;
    transport.write(&payload)?;
    info!(len = payload.len(), "master key written to medium");
    Ok(())
}

/// Reads a payload of either layout from `transport` and opens it.
///
/// # Errors
///
/// [`TransportError::NotFound`] if the medium is blank; otherwise any codec
/// or transport error.
pub fn read_master_key<T, R>(
    transport: &mut T,
    codec: &PayloadCodec<R>,
    pin: Zeroizing<String>,
) -> Result<Zeroizing<Vec<u8>>>
where
    T: Transport + ?Sized,
    R: SecureRandom,
{
    let payload = transport.read()?.ok_or(TransportError::NotFound)?;
    codec.decrypt_detect(&payload, pin)
}
