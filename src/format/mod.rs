//! Payload layouts written to the medium.
//!
//! Two layouts exist. The legacy one carries no version and is fixed at
//! 100,000 PBKDF2 iterations; v1 prefixes a magic, a version byte and the
//! iteration count so the cost factor can change later.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::crypto::{KdfParams, MAX_MASTER_KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::{Error, Result};

pub mod legacy;
pub mod v1;

/// Magic bytes opening a versioned payload ("PS").
pub const MAGIC: &[u8; 2] = b"PS";
/// Length of magic bytes.
pub const MAGIC_LEN: usize = 2;
/// Length of version field.
pub const VER_LEN: usize = 1;
/// Latest versioned layout.
pub const CURRENT_VERSION: u8 = v1::VERSION_V1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `salt ‖ nonce ‖ ciphertext‖tag`, no header.
    #[default]
    Legacy,
    /// `magic ‖ version ‖ iterations ‖ salt ‖ nonce ‖ ciphertext‖tag`.
    V1,
}

impl Format {
    /// Bytes in front of the ciphertext.
    pub fn header_len(self) -> usize {
        match self {
            Format::Legacy => legacy::HEADER_LEN,
            Format::V1 => v1::HEADER_LEN,
        }
    }

    /// Smallest payload this layout can hold: header, empty ciphertext, tag.
    pub fn min_len(self) -> usize {
        self.header_len() + TAG_LEN
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Legacy => f.write_str("legacy"),
            Format::V1 => f.write_str("v1"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Format::Legacy),
            "v1" => Ok(Format::V1),
            other => Err(format!("unknown payload format '{other}'")),
        }
    }
}

/// A parsed payload with all of its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    format: Format,
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Payload {
    pub fn new(
        format: Format,
        kdf: KdfParams,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            format,
            kdf,
            salt,
            nonce,
            ciphertext,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// KDF parameters the key must be re-derived with.
    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext with the authentication tag appended.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Length of the serialized form.
    pub fn encoded_len(&self) -> usize {
        self.format.header_len() + self.ciphertext.len()
    }

    /// Header bytes the authentication tag covers.
    pub fn associated_data(&self) -> Vec<u8> {
        associated_data(self.format, &self.kdf)
    }

    /// Non-secret summary of the payload.
    pub fn info(&self) -> PayloadInfo {
        PayloadInfo {
            format: self.format,
            iterations: self.kdf.iterations(),
            payload_len: self.encoded_len(),
            master_key_len: self.ciphertext.len().saturating_sub(TAG_LEN),
        }
    }
}

/// Metadata that can be shown without knowing the PIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayloadInfo {
    pub format: Format,
    pub iterations: u32,
    pub payload_len: usize,
    pub master_key_len: usize,
}

impl fmt::Display for PayloadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "format:         {}", self.format)?;
        writeln!(f, "iterations:     {}", self.iterations)?;
        writeln!(f, "payload bytes:  {}", self.payload_len)?;
        write!(f, "master key len: {}", self.master_key_len)
    }
}

/// Header bytes bound into the tag for a payload of `format`.
///
/// The legacy layout authenticates nothing beyond the ciphertext; v1 binds
/// its magic, version and iteration count.
pub fn associated_data(format: Format, kdf: &KdfParams) -> Vec<u8> {
    match format {
        Format::Legacy => Vec::new(),
        Format::V1 => v1::prefix(kdf).to_vec(),
    }
}

/// Guesses the layout of `data`.
///
/// A legacy payload starts with a random salt, so roughly one in 2^24 of
/// them would look versioned. New legacy payloads never use such a salt,
/// and the codec falls back to [`Format::Legacy`] when a versioned parse
/// is malformed.
pub fn detect(data: &[u8]) -> Format {
    if data.len() > MAGIC_LEN && &data[..MAGIC_LEN] == MAGIC && data[MAGIC_LEN] == CURRENT_VERSION
    {
        Format::V1
    } else {
        Format::Legacy
    }
}

/// Parses a payload in the given layout.
///
/// # Errors
///
/// Returns [`Error::MalformedPayload`] if:
/// - The payload is shorter than header plus tag
/// - The ciphertext exceeds the largest sealable master key
/// - A versioned header has a bad magic, version or iteration count
pub fn parse(data: &[u8], format: Format) -> Result<Payload> {
    if data.len() < format.min_len() {
        return Err(Error::MalformedPayload(format!(
            "{} bytes is too short for a {format} payload (minimum {})",
            data.len(),
            format.min_len()
        )));
    }

    let payload = match format {
        Format::Legacy => legacy::parse(data)?,
        Format::V1 => {
            if &data[..MAGIC_LEN] != MAGIC {
                return Err(Error::MalformedPayload("invalid magic".into()));
            }
            match data[MAGIC_LEN] {
                v1::VERSION_V1 => v1::parse(data)?,
                v => {
                    return Err(Error::MalformedPayload(format!(
                        "unsupported payload version: {v}"
                    )));
                }
            }
        }
    };

    if payload.ciphertext().len() > MAX_MASTER_KEY_LEN + TAG_LEN {
        return Err(Error::MalformedPayload("ciphertext too long".into()));
    }

    Ok(payload)
}

/// Serializes a payload in its own layout.
///
/// # Errors
///
/// Returns [`Error::Encryption`] if the payload's parameters cannot be
/// expressed in its layout.
pub fn serialize(payload: &Payload) -> Result<Vec<u8>> {
    match payload.format() {
        Format::Legacy => legacy::serialize(payload),
        Format::V1 => v1::serialize(payload),
    }
}
