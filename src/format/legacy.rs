//! Version-less payload layout.
//!
//! ```text
//! SALT (16) | NONCE (12) | CIPHERTEXT ‖ TAG (N + 16)
//! ```

use super::{Format, Payload};
use crate::{
    crypto::{KdfParams, NONCE_LEN, SALT_LEN},
    error::{Error, Result},
};

pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// Parses a legacy payload. Length has already been checked by the caller.
pub fn parse(data: &[u8]) -> Result<Payload> {
    let salt: [u8; SALT_LEN] = data[..SALT_LEN]
        .try_into()
        .map_err(|_| Error::MalformedPayload("invalid salt length".into()))?;

    let nonce: [u8; NONCE_LEN] = data[SALT_LEN..HEADER_LEN]
        .try_into()
        .map_err(|_| Error::MalformedPayload("invalid nonce length".into()))?;

    Ok(Payload::new(
        Format::Legacy,
        KdfParams::legacy(),
        salt,
        nonce,
        data[HEADER_LEN..].to_vec(),
    ))
}

/// Serializes a payload into the legacy layout.
///
/// # Errors
///
/// Fails if the payload was not derived with the fixed legacy iteration
/// count, since the layout has nowhere to record another one.
pub fn serialize(payload: &Payload) -> Result<Vec<u8>> {
    if *payload.kdf() != KdfParams::legacy() {
        return Err(Error::Encryption(format!(
            "legacy layout requires {} iterations",
            KdfParams::legacy().iterations()
        )));
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.ciphertext().len());
    buf.extend_from_slice(payload.salt());
    buf.extend_from_slice(payload.nonce());
    buf.extend_from_slice(payload.ciphertext());

    Ok(buf)
}
