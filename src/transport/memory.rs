use super::Transport;
use crate::error::TransportError;

/// A medium held in memory, optionally limited like a small tag.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    data: Option<Vec<u8>>,
    capacity: Option<usize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A blank medium that holds at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: None,
            capacity: Some(capacity),
        }
    }

    pub fn contents(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Direct access to the stored bytes, e.g. to simulate a damaged medium.
    pub fn contents_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.data.as_mut()
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if let Some(available) = self.capacity {
            if bytes.len() > available {
                return Err(TransportError::Capacity {
                    needed: bytes.len(),
                    available,
                });
            }
        }
        self.data = Some(bytes.to_vec());
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.data.clone())
    }
}
