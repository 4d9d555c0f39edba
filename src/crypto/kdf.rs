use hmac::Hmac;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use super::{KEY_LEN, SALT_LEN};
use crate::error::{Error, Result};

/// Iteration count of the version-less payload layout.
pub const LEGACY_ITERATIONS: u32 = 100_000;
pub const MIN_ITERATIONS: u32 = 1_000;
/// Upper bound so a crafted payload cannot stall decryption indefinitely.
pub const MAX_ITERATIONS: u32 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::legacy()
    }
}

impl KdfParams {
    pub fn new(iterations: u32) -> Result<Self> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    /// Parameters every version-less payload was written with.
    pub const fn legacy() -> Self {
        Self {
            iterations: LEGACY_ITERATIONS,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(Error::Derivation(format!(
                "iteration count must be >= {MIN_ITERATIONS}"
            )));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(Error::Derivation(format!(
                "iteration count must be <= {MAX_ITERATIONS}"
            )));
        }
        Ok(())
    }
}

/// Stretches a PIN into a 256-bit key with PBKDF2-HMAC-SHA256.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDeriver {
    params: KdfParams,
}

impl KeyDeriver {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Derives the cipher key for `pin` and `salt`.
    ///
    /// The same inputs always produce the same key. The key is wiped when
    /// the returned wrapper is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Derivation`] if the PIN is empty, the parameters are
    /// out of range, or the PRF rejects its inputs.
    pub fn derive(&self, pin: &str, salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        if pin.is_empty() {
            return Err(Error::Derivation("PIN must not be empty".into()));
        }
        self.params.validate()?;

        debug!(iterations = self.params.iterations, "deriving key from PIN");

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2::<Hmac<Sha256>>(
            pin.as_bytes(),
            salt,
            self.params.iterations,
            &mut key[..],
        )
        .map_err(|_| Error::Derivation("PRF rejected its inputs".into()))?;

        Ok(key)
    }
}
