//! NDEF framing for NFC tags.
//!
//! Tags speak NDEF, so the payload is stored as the single MIME record of
//! an NDEF message. Only the subset needed for that is implemented: one
//! unchunked record, short or long form, optional ID field skipped on read.

use tracing::debug;

use super::Transport;
use crate::error::TransportError;

/// Record type the payload is stored under.
pub const MIME_TYPE: &str = "application/vnd.pinseal.masterkey";

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

const TNF_EMPTY: u8 = 0x00;
const TNF_MIME: u8 = 0x02;

/// Wraps a medium so that writes become NDEF messages.
#[derive(Debug, Clone)]
pub struct NdefTransport<T> {
    inner: T,
    mime_type: String,
}

impl<T: Transport> NdefTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            mime_type: MIME_TYPE.to_string(),
        }
    }

    /// Stores under another record type.
    pub fn with_mime_type(mut self, mime_type: &str) -> Result<Self, TransportError> {
        check_mime_type(mime_type)?;
        self.mime_type = mime_type.to_string();
        Ok(self)
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for NdefTransport<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let message = encode_mime_record(&self.mime_type, bytes)?;
        debug!(record_len = message.len(), "framed payload as NDEF record");
        self.inner.write(&message)
    }

    fn read(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.inner.read()? {
            Some(message) => decode_mime_record(&message, &self.mime_type),
            None => Ok(None),
        }
    }
}

fn check_mime_type(mime_type: &str) -> Result<(), TransportError> {
    if mime_type.is_empty() || mime_type.len() > u8::MAX as usize {
        return Err(TransportError::Unsupported(
            "MIME type must be 1 to 255 bytes".into(),
        ));
    }
    Ok(())
}

/// Builds a one-record NDEF message carrying `payload` under `mime_type`.
///
/// # Errors
///
/// Returns [`TransportError::Unsupported`] if `mime_type` is empty or longer
/// than 255 bytes, or `payload` does not fit a 32-bit length.
pub fn encode_mime_record(mime_type: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    check_mime_type(mime_type)?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| TransportError::Unsupported("payload too large for an NDEF record".into()))?;
    let short = payload_len <= u32::from(u8::MAX);

    let mut flags = FLAG_MB | FLAG_ME | TNF_MIME;
    if short {
        flags |= FLAG_SR;
    }

    let mut buf = Vec::with_capacity(6 + mime_type.len() + payload.len());
    buf.push(flags);
    buf.push(mime_type.len() as u8);
    if short {
        buf.push(payload_len as u8);
    } else {
        buf.extend_from_slice(&payload_len.to_be_bytes());
    }
    buf.extend_from_slice(mime_type.as_bytes());
    buf.extend_from_slice(payload);

    Ok(buf)
}

/// Extracts the payload of the first record of `message`.
///
/// Returns `Ok(None)` for an empty NDEF message (a formatted, blank tag).
///
/// # Errors
///
/// Returns [`TransportError::Unsupported`] if the message is truncated,
/// chunked, or its first record is not a MIME record of `mime_type`.
pub fn decode_mime_record(
    message: &[u8],
    mime_type: &str,
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut reader = Reader { data: message, pos: 0 };

    let flags = reader.byte()?;
    if flags & FLAG_MB == 0 {
        return Err(TransportError::Unsupported("not an NDEF message".into()));
    }
    if flags & FLAG_CF != 0 {
        return Err(TransportError::Unsupported(
            "chunked NDEF records are not supported".into(),
        ));
    }

    let tnf = flags & TNF_MASK;
    if tnf == TNF_EMPTY {
        return Ok(None);
    }
    if tnf != TNF_MIME {
        return Err(TransportError::Unsupported(format!(
            "first NDEF record has TNF {tnf}, expected a MIME record"
        )));
    }

    let type_len = reader.byte()? as usize;
    let payload_len = if flags & FLAG_SR != 0 {
        reader.byte()? as usize
    } else {
        let bytes: [u8; 4] = reader
            .take(4)?
            .try_into()
            .map_err(|_| truncated())?;
        u32::from_be_bytes(bytes) as usize
    };
    let id_len = if flags & FLAG_IL != 0 {
        reader.byte()? as usize
    } else {
        0
    };

    let record_type = reader.take(type_len)?;
    if !record_type.eq_ignore_ascii_case(mime_type.as_bytes()) {
        return Err(TransportError::Unsupported(format!(
            "unexpected NDEF record type '{}'",
            String::from_utf8_lossy(record_type)
        )));
    }
    reader.take(id_len)?;

    Ok(Some(reader.take(payload_len)?.to_vec()))
}

fn truncated() -> TransportError {
    TransportError::Unsupported("truncated NDEF record".into())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, TransportError> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TransportError> {
        let end = self.pos.checked_add(n).ok_or_else(truncated)?;
        let slice = self.data.get(self.pos..end).ok_or_else(truncated)?;
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn short_record_layout() {
        let msg = encode_mime_record("a/b", b"xyz").unwrap();
        assert_eq!(msg, [0xD2, 3, 3, b'a', b'/', b'b', b'x', b'y', b'z']);
    }

    #[test]
    fn long_record_layout() {
        let payload = vec![7u8; 300];
        let msg = encode_mime_record("a/b", &payload).unwrap();

        assert_eq!(msg[0], 0xC2);
        assert_eq!(&msg[2..6], &300u32.to_be_bytes());
        assert_eq!(msg.len(), 6 + 3 + 300);
        assert_eq!(decode_mime_record(&msg, "a/b").unwrap().unwrap(), payload);
    }

    #[test]
    fn id_field_is_skipped() {
        // MB|ME|SR|IL|MIME, type 3, payload 2, id 1
        let msg = [0xDA, 3, 2, 1, b'a', b'/', b'b', b'#', 0xAA, 0xBB];
        assert_eq!(
            decode_mime_record(&msg, "a/b").unwrap().unwrap(),
            vec![0xAA, 0xBB]
        );
    }

    #[test]
    fn empty_message_reads_none() {
        assert!(decode_mime_record(&[0xD0, 0, 0], MIME_TYPE).unwrap().is_none());
    }

    #[test]
    fn foreign_records_are_unsupported() {
        // well-known URI record
        let uri = [0xD1, 1, 2, b'U', 0x01, b'x'];
        assert!(matches!(
            decode_mime_record(&uri, MIME_TYPE),
            Err(TransportError::Unsupported(_))
        ));

        let other = encode_mime_record("text/plain", b"hi").unwrap();
        assert!(matches!(
            decode_mime_record(&other, MIME_TYPE),
            Err(TransportError::Unsupported(_))
        ));
    }

    #[test]
    fn truncated_and_chunked_messages_are_unsupported() {
        let msg = encode_mime_record(MIME_TYPE, b"payload").unwrap();
        assert!(matches!(
            decode_mime_record(&msg[..msg.len() - 1], MIME_TYPE),
            Err(TransportError::Unsupported(_))
        ));
        assert!(matches!(
            decode_mime_record(&[], MIME_TYPE),
            Err(TransportError::Unsupported(_))
        ));
        assert!(matches!(
            decode_mime_record(&[0xF2, 0, 0], MIME_TYPE),
            Err(TransportError::Unsupported(_))
        ));
    }

    #[test]
    fn transport_frames_and_unframes() {
        let mut tag = NdefTransport::new(MemoryTransport::new());

        assert!(tag.read().unwrap().is_none());

        tag.write(b"payload").unwrap();
        assert_eq!(tag.read().unwrap().unwrap(), b"payload");

        let raw = tag.into_inner();
        assert_eq!(raw.contents().unwrap()[0], 0xD2);
    }

    #[test]
    fn oversized_or_empty_type_is_not_encoded() {
        assert!(matches!(
            encode_mime_record(&"x".repeat(256), b"payload"),
            Err(TransportError::Unsupported(_))
        ));
        assert!(matches!(
            encode_mime_record("", b"payload"),
            Err(TransportError::Unsupported(_))
        ));

        let longest = "x".repeat(255);
        let msg = encode_mime_record(&longest, b"payload").unwrap();
        assert_eq!(msg[1], 255);
        assert_eq!(
            decode_mime_record(&msg, &longest).unwrap().unwrap(),
            b"payload"
        );
    }

    #[test]
    fn mime_type_bounds() {
        let tag = NdefTransport::new(MemoryTransport::new());
        assert!(tag.clone().with_mime_type("").is_err());
        assert!(tag.clone().with_mime_type(&"x".repeat(256)).is_err());
        assert!(tag.with_mime_type("application/x-test").is_ok());
    }
}
