//! Little-endian byte cursor shared by every parse step.
//!
//! [`ByteReader`] wraps the unread tail of a byte slice and hands out
//! fixed-width integers, fixed arrays and length-prefixed payloads. Every
//! read checks the remaining length first: a short buffer is reported as
//! [`ValidationError::MalformedAttachment`] instead of a panic, which is
//! what makes the codec safe to point at attacker-supplied bytes.
//!
//! Parse steps take the reader by `&mut`, so exactly one step owns the
//! unread bytes at any time and each consumes only its own fields.
//!
//! Writes go straight into a `Vec<u8>` through [`bytes::BufMut`].

use bytes::{Buf, BufMut};

use super::error::ValidationError;

/// Bounds-checked little-endian reader over a byte slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { buf: bytes }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn require(&self, needed: usize, field: &str) -> Result<(), ValidationError> {
        if self.buf.remaining() < needed {
            return Err(ValidationError::malformed(format!(
                "{field}: need {needed} bytes, {} remaining",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &str) -> Result<u8, ValidationError> {
        self.require(1, field)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self, field: &str) -> Result<u16, ValidationError> {
        self.require(2, field)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self, field: &str) -> Result<u32, ValidationError> {
        self.require(4, field)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u64(&mut self, field: &str) -> Result<u64, ValidationError> {
        self.require(8, field)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_i64(&mut self, field: &str) -> Result<i64, ValidationError> {
        self.require(8, field)?;
        Ok(self.buf.get_i64_le())
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self, field: &str) -> Result<[u8; N], ValidationError> {
        self.require(N, field)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read `len` raw bytes.
    ///
    /// Callers bound `len` against the field's maximum before calling, so
    /// a forged length cannot trigger a large allocation.
    pub fn read_vec(&mut self, len: usize, field: &str) -> Result<Vec<u8>, ValidationError> {
        self.require(len, field)?;
        let mut out = vec![0u8; len];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read `len` bytes and decode them as UTF-8.
    pub fn read_string(&mut self, len: usize, field: &str) -> Result<String, ValidationError> {
        let raw = self.read_vec(len, field)?;
        String::from_utf8(raw)
            .map_err(|_| ValidationError::malformed(format!("{field}: invalid UTF-8")))
    }

    /// Consume the reader, failing if any bytes were left unread.
    pub fn finish(self, context: &str) -> Result<(), ValidationError> {
        if self.buf.has_remaining() {
            return Err(ValidationError::malformed(format!(
                "{context}: {} trailing bytes",
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}

/// Reject a declared length above `max` before any bytes are read.
pub(crate) fn check_length(len: usize, max: usize, field: &str) -> Result<(), ValidationError> {
    if len > max {
        return Err(ValidationError::malformed(format!(
            "{field}: length {len} exceeds maximum {max}"
        )));
    }
    Ok(())
}

/// Write a string prefixed by its length as one byte.
pub(crate) fn put_short_string(buf: &mut Vec<u8>, value: &str) {
    buf.put_u8(value.len() as u8);
    buf.put_slice(value.as_bytes());
}

/// Write a string prefixed by its length as a little-endian `u16`.
pub(crate) fn put_long_string(buf: &mut Vec<u8>, value: &str) {
    buf.put_u16_le(value.len() as u16);
    buf.put_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let bytes = [0x01, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8("a").unwrap(), 1);
        assert_eq!(reader.read_u16("b").unwrap(), 2);
        assert_eq!(reader.read_u32("c").unwrap(), 3);
        assert!(reader.is_empty());
    }

    #[test]
    fn underrun_is_malformed_not_panic() {
        let bytes = [0u8; 3];
        let mut reader = ByteReader::new(&bytes);
        let err = reader.read_u32("length").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedAttachment(ref m) if m.contains("length")));
    }

    #[test]
    fn failed_read_consumes_nothing() {
        let bytes = [9u8; 5];
        let mut reader = ByteReader::new(&bytes);
        assert!(reader.read_u64("id").is_err());
        assert_eq!(reader.remaining(), 5);
        assert_eq!(reader.read_array::<5>("rest").unwrap(), [9u8; 5]);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let bytes = [0xFF, 0xFE];
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            reader.read_string(2, "name"),
            Err(ValidationError::MalformedAttachment(_))
        ));
    }

    #[test]
    fn finish_rejects_trailing_bytes() {
        let bytes = [1u8, 2];
        let mut reader = ByteReader::new(&bytes);
        reader.read_u8("first").unwrap();
        assert!(reader.finish("blob").is_err());
    }

    #[test]
    fn string_writers_prefix_length() {
        let mut buf = Vec::new();
        put_short_string(&mut buf, "ab");
        put_long_string(&mut buf, "xyz");
        assert_eq!(buf, vec![2, b'a', b'b', 3, 0, b'x', b'y', b'z']);
    }
}
