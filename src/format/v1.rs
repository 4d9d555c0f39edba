//! Payload format v1.
//!
//! ```text
//! MAGIC (2) | VERSION (1) | ITERATIONS (4, LE) | SALT (16) | NONCE (12) | CIPHERTEXT ‖ TAG
//! ```

use super::{Format, MAGIC, MAGIC_LEN, Payload, VER_LEN};
use crate::{
    crypto::{KdfParams, NONCE_LEN, SALT_LEN},
    error::{Error, Result},
};

pub const VERSION_V1: u8 = 1;

const ITER_LEN: usize = 4;

pub const PREFIX_LEN: usize = MAGIC_LEN + VER_LEN + ITER_LEN;

pub const HEADER_LEN: usize = PREFIX_LEN + SALT_LEN + NONCE_LEN;

/// Parses a v1 payload. Magic, version and length are checked by the caller.
///
/// # Errors
///
/// Returns an error if the recorded iteration count is out of range.
pub fn parse(data: &[u8]) -> Result<Payload> {
    let malformed = |what: &str| Error::MalformedPayload(format!("invalid {what} field"));

    let mut offset = MAGIC_LEN + VER_LEN;

    let iterations = u32::from_le_bytes(
        data[offset..offset + ITER_LEN]
            .try_into()
            .map_err(|_| malformed("iterations"))?,
    );
    offset += ITER_LEN;

    let salt: [u8; SALT_LEN] = data[offset..offset + SALT_LEN]
        .try_into()
        .map_err(|_| malformed("salt"))?;
    offset += SALT_LEN;

    let nonce: [u8; NONCE_LEN] = data[offset..offset + NONCE_LEN]
        .try_into()
        .map_err(|_| malformed("nonce"))?;
    offset += NONCE_LEN;

    let kdf = KdfParams::new(iterations)
        .map_err(|_| Error::MalformedPayload(format!("iteration count {iterations} out of range")))?;

    Ok(Payload::new(
        Format::V1,
        kdf,
        salt,
        nonce,
        data[offset..].to_vec(),
    ))
}

/// Magic, version and iteration count. Bound into the tag as associated data.
pub fn prefix(kdf: &KdfParams) -> [u8; PREFIX_LEN] {
    let mut buf = [0u8; PREFIX_LEN];
    buf[..MAGIC_LEN].copy_from_slice(MAGIC);
    buf[MAGIC_LEN] = VERSION_V1;
    buf[MAGIC_LEN + VER_LEN..].copy_from_slice(&kdf.iterations().to_le_bytes());
    buf
}

/// Serializes a payload to v1 bytes.
pub fn serialize(payload: &Payload) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.ciphertext().len());

    buf.extend_from_slice(&prefix(payload.kdf()));
    buf.extend_from_slice(payload.salt());
    buf.extend_from_slice(payload.nonce());
    buf.extend_from_slice(payload.ciphertext());

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let payload = Payload::new(
            Format::V1,
            KdfParams::new(250_000).unwrap(),
            [1u8; SALT_LEN],
            [2u8; NONCE_LEN],
            vec![0u8; 20],
        );

        let bytes = serialize(&payload).unwrap();

        assert_eq!(bytes.len(), HEADER_LEN + 20);
        assert_eq!(&bytes[..3], b"PS\x01");
        assert_eq!(&bytes[3..7], &250_000u32.to_le_bytes());

        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.format(), Format::V1);
        assert_eq!(parsed.kdf().iterations(), 250_000);
        assert_eq!(parsed, payload);
    }

    #[test]
    fn prefix_is_the_leading_header_bytes() {
        let kdf = KdfParams::new(5_000).unwrap();
        let payload = Payload::new(Format::V1, kdf, [1u8; SALT_LEN], [2u8; NONCE_LEN], vec![0u8; 16]);

        let bytes = serialize(&payload).unwrap();

        assert_eq!(&bytes[..PREFIX_LEN], &prefix(&kdf));
    }

    #[test]
    fn out_of_range_iterations_are_malformed() {
        let mut data = vec![0u8; HEADER_LEN + 16];
        data[..3].copy_from_slice(b"PS\x01");
        data[3..7].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(parse(&data), Err(Error::MalformedPayload(_))));

        data[3..7].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(parse(&data), Err(Error::MalformedPayload(_))));
    }
}
