//! Source of salts and nonces.
//!
//! The codec takes its randomness as a capability so tests can pin the
//! output while production draws from the operating system.

use getrandom::fill;

use crate::error::{Error, Result};

pub trait SecureRandom: Send + Sync {
    /// Fill `buf` entirely with unpredictable bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        fill(buf).map_err(|_| Error::Encryption("OS random generator unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_random_fills_distinct_buffers() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];

        OsRandom.fill(&mut a).unwrap();
        OsRandom.fill(&mut b).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn empty_buffer_is_fine() {
        OsRandom.fill(&mut []).unwrap();
    }
}
