//! Media that payloads are written to and read from.
//!
//! The codec never touches a medium itself; callers move the framed bytes
//! through a [`Transport`]. A medium must deliver the whole payload at once.

use crate::error::TransportError;

pub mod file;
pub mod memory;
pub mod ndef;

pub use file::FileTransport;
pub use memory::MemoryTransport;
pub use ndef::NdefTransport;

pub trait Transport {
    /// Replaces whatever the medium holds with `bytes`.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Returns the stored bytes, or `None` if the medium is blank.
    fn read(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}
