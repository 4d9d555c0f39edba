//! Sealing and opening of master keys.
//!
//! [`PayloadCodec`] ties key derivation, AES-256-GCM and the payload
//! layouts together. It holds no secret state, so one codec can be shared
//! across threads.

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{
    self, KdfParams, KeyDeriver, MAX_MASTER_KEY_LEN, NONCE_LEN, SALT_LEN,
};
use crate::error::{Error, Result};
use crate::format::{self, Format, Payload, PayloadInfo};
use crate::random::{OsRandom, SecureRandom};

/// Attempts at drawing a legacy salt that does not open like a v1 header.
const MAX_SALT_DRAWS: usize = 8;

#[derive(Debug, Clone)]
pub struct PayloadCodec<R = OsRandom> {
    format: Format,
    kdf: KdfParams,
    random: R,
}

impl Default for PayloadCodec<OsRandom> {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCodec<OsRandom> {
    /// Legacy layout, 100,000 iterations, OS randomness.
    pub fn new() -> Self {
        Self {
            format: Format::Legacy,
            kdf: KdfParams::legacy(),
            random: OsRandom,
        }
    }
}

impl<R: SecureRandom> PayloadCodec<R> {
    /// Replaces the source of salts and nonces.
    pub fn with_random<S: SecureRandom>(self, random: S) -> PayloadCodec<S> {
        PayloadCodec {
            format: self.format,
            kdf: self.kdf,
            random,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the iteration count for new payloads. Only the v1 layout can
    /// record a non-default count.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Seals `master_key` under `pin`.
    ///
    /// The PIN is wiped as soon as the key has been derived. A legacy
    /// payload is exactly `44 + master_key.len()` bytes long.
    ///
    /// # Errors
    ///
    /// - [`Error::Encryption`] if the master key is empty or longer than
    ///   [`MAX_MASTER_KEY_LEN`], or the random source fails
    /// - [`Error::Derivation`] if the PIN is empty
    pub fn encrypt(&self, master_key: &[u8], pin: Zeroizing<String>) -> Result<Vec<u8>> {
        if master_key.is_empty() {
            return Err(Error::Encryption("master key must not be empty".into()));
        }
        if master_key.len() > MAX_MASTER_KEY_LEN {
            return Err(Error::Encryption(format!(
                "master key exceeds {MAX_MASTER_KEY_LEN} bytes"
            )));
        }
        if self.format == Format::Legacy && self.kdf != KdfParams::legacy() {
            return Err(Error::Encryption(format!(
                "legacy layout requires {} iterations",
                KdfParams::legacy().iterations()
            )));
        }

        let salt = self.draw_salt()?;
        let mut nonce = [0u8; NONCE_LEN];
        self.random.fill(&mut nonce)?;

        let key = KeyDeriver::new(self.kdf).derive(&pin, &salt)?;
        drop(pin);

        let aad = format::associated_data(self.format, &self.kdf);
        let ciphertext = crypto::aead::seal(&key, &nonce, master_key, &aad)?;
        drop(key);

        let payload = Payload::new(self.format, self.kdf, salt, nonce, ciphertext);
        let bytes = format::serialize(&payload)?;

        debug!(
            format = %self.format,
            payload_len = bytes.len(),
            "sealed master key"
        );
        Ok(bytes)
    }

    /// Opens a payload written in this codec's layout.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedPayload`] if the payload cannot be framed
    /// - [`Error::AuthenticationFailed`] on a wrong PIN or any tampering
    pub fn decrypt(&self, payload: &[u8], pin: Zeroizing<String>) -> Result<Zeroizing<Vec<u8>>> {
        let payload = format::parse(payload, self.format)?;
        open_payload(&payload, pin)
    }

    /// Opens a payload of either layout, picking it with [`format::detect`].
    ///
    /// A payload that looks versioned but does not parse as v1 is retried
    /// as legacy, since its first bytes may just be salt.
    pub fn decrypt_detect(
        &self,
        payload: &[u8],
        pin: Zeroizing<String>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let detected = format::detect(payload);
        debug!(format = %detected, "detected payload layout");

        let parsed = match format::parse(payload, detected) {
            Err(Error::MalformedPayload(reason)) if detected == Format::V1 => {
                debug!(%reason, "not a v1 payload, retrying as legacy");
                format::parse(payload, Format::Legacy)?
            }
            other => other?,
        };
        open_payload(&parsed, pin)
    }

    /// Draws a salt. Legacy salts that would be detected as a v1 header are
    /// thrown away.
    fn draw_salt(&self) -> Result<[u8; SALT_LEN]> {
        let mut salt = [0u8; SALT_LEN];
        for _ in 0..MAX_SALT_DRAWS {
            self.random.fill(&mut salt)?;
            if self.format != Format::Legacy || format::detect(&salt) == Format::Legacy {
                return Ok(salt);
            }
            debug!("legacy salt starts like a v1 header, drawing again");
        }
        Err(Error::Encryption(
            "random source keeps producing versioned-looking salts".into(),
        ))
    }
}

fn open_payload(payload: &Payload, pin: Zeroizing<String>) -> Result<Zeroizing<Vec<u8>>> {
    let key = KeyDeriver::new(*payload.kdf()).derive(&pin, payload.salt())?;
    drop(pin);

    let aad = payload.associated_data();
    match crypto::aead::open(&key, payload.nonce(), payload.ciphertext(), &aad) {
        Ok(master_key) => {
            debug!(len = master_key.len(), "opened master key");
            Ok(master_key)
        }
        Err(e) => {
            warn!("payload authentication failed");
            Err(e)
        }
    }
}

/// Describes a payload without decrypting it.
pub fn inspect(payload: &[u8], format: Format) -> Result<PayloadInfo> {
    Ok(format::parse(payload, format)?.info())
}
