//! Wire primitives
//!
//! # Format
//!
//! ```text
//! varint   ZigZag-mapped i64, then LEB128 (7 bits per byte, low group first),
//!          at most 10 bytes
//! text     varint byte length + UTF-8 bytes
//! binary   varint byte length + raw bytes
//! byte     1 byte; boolean is 0 or 1
//! float    4 bytes, IEEE-754 bits, little-endian
//! double   8 bytes, IEEE-754 bits, little-endian
//! decimal  8-byte unscaled magnitude + 4-byte scale, little-endian
//! ```

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use docwire_core::{Decimal, Error, Result};

/// Longest valid varint encoding.
pub const MAX_VARINT_LEN: usize = 10;

/// Map a signed value to unsigned so small magnitudes stay small.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Encode `value` as a varint, appending to `buf`.
pub fn encode_varint(value: i64, buf: &mut Vec<u8>) {
    let mut value = zigzag_encode(value);
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Number of bytes [`encode_varint`] writes for `value`.
pub fn varint_len(value: i64) -> usize {
    let bits = 64 - zigzag_encode(value).leading_zeros() as usize;
    (bits.max(1) + 6) / 7
}

// ============================================================================
// WireWriter
// ============================================================================

/// Growable output buffer.
#[derive(Debug, Clone, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a boolean as 0 or 1.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Write a varint.
    pub fn write_varint(&mut self, value: i64) {
        encode_varint(value, &mut self.buf);
    }

    /// Write a length, count or position as a varint.
    pub fn write_len(&mut self, len: usize) {
        // usize values beyond i64::MAX cannot occur for in-memory collections
        self.write_varint(len as i64);
    }

    /// Write length-prefixed UTF-8 text.
    pub fn write_text(&mut self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Write a length-prefixed byte blob.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// Write bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a 4-byte float.
    pub fn write_f32(&mut self, value: f32) {
        vec_write(self.buf.write_f32::<LittleEndian>(value));
    }

    /// Write an 8-byte double.
    pub fn write_f64(&mut self, value: f64) {
        vec_write(self.buf.write_f64::<LittleEndian>(value));
    }

    /// Write a decimal: 8-byte unscaled magnitude then 4-byte scale.
    pub fn write_decimal(&mut self, value: Decimal) {
        vec_write(self.buf.write_i64::<LittleEndian>(value.unscaled));
        vec_write(self.buf.write_i32::<LittleEndian>(value.scale));
    }
}

// io::Write on a Vec<u8> only grows the buffer and never returns an error
fn vec_write(result: std::io::Result<()>) {
    debug_assert!(result.is_ok(), "write to Vec<u8> failed");
}

// ============================================================================
// WireReader
// ============================================================================

/// Cursor over an input buffer.
///
/// Every read reports failures as `MalformedStream` at the offset where the
/// failing item started.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WireReader<'a> {
    /// Create a reader at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    /// Check if the input is fully consumed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail unless the input is fully consumed.
    pub fn expect_end(&self) -> Result<()> {
        if self.is_exhausted() {
            Ok(())
        } else {
            Err(Error::malformed(
                self.position(),
                format!("{} trailing bytes", self.remaining()),
            ))
        }
    }

    fn eof(start: usize, what: &str) -> Error {
        Error::malformed(start, format!("unexpected end of input reading {}", what))
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let start = self.position();
        self.cursor.read_u8().map_err(|_| Self::eof(start, "byte"))
    }

    /// Read a boolean; only 0 and 1 are accepted.
    pub fn read_bool(&mut self) -> Result<bool> {
        let start = self.position();
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::malformed(
                start,
                format!("invalid boolean byte {:#04x}", other),
            )),
        }
    }

    /// Read a varint.
    pub fn read_varint(&mut self) -> Result<i64> {
        let start = self.position();
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self
                .cursor
                .read_u8()
                .map_err(|_| Self::eof(start, "varint"))?;
            let group = u64::from(byte & 0x7F);
            if i == MAX_VARINT_LEN - 1 && group > 1 {
                return Err(Error::malformed(start, "varint overflows 64 bits"));
            }
            value |= group << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(zigzag_decode(value));
            }
        }
        Err(Error::malformed(start, "varint longer than 10 bytes"))
    }

    /// Read a varint that must fit in an `i32`.
    pub fn read_i32_varint(&mut self) -> Result<i32> {
        let start = self.position();
        let value = self.read_varint()?;
        i32::try_from(value)
            .map_err(|_| Error::malformed(start, format!("{} does not fit a 32-bit integer", value)))
    }

    /// Read a varint that must fit in an `i16`.
    pub fn read_i16_varint(&mut self) -> Result<i16> {
        let start = self.position();
        let value = self.read_varint()?;
        i16::try_from(value)
            .map_err(|_| Error::malformed(start, format!("{} does not fit a 16-bit integer", value)))
    }

    /// Read a non-negative position or size.
    pub fn read_index(&mut self) -> Result<usize> {
        let start = self.position();
        let value = self.read_varint()?;
        usize::try_from(value)
            .map_err(|_| Error::malformed(start, format!("negative length or position {}", value)))
    }

    /// Read a byte length or element count.
    ///
    /// Every counted item takes at least one byte, so a count larger than the
    /// remaining input is rejected before anything is allocated.
    pub fn read_len(&mut self) -> Result<usize> {
        let start = self.position();
        let len = self.read_index()?;
        if len > self.remaining() {
            return Err(Error::malformed(
                start,
                format!("length {} exceeds remaining {} bytes", len, self.remaining()),
            ));
        }
        Ok(len)
    }

    /// Read `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let start = self.position();
        if len > self.remaining() {
            return Err(Self::eof(start, "bytes"));
        }
        let mut out = vec![0u8; len];
        self.cursor
            .read_exact(&mut out)
            .map_err(|_| Self::eof(start, "bytes"))?;
        Ok(out)
    }

    /// Read a length-prefixed byte blob.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    /// Read length-prefixed UTF-8 text.
    pub fn read_text(&mut self) -> Result<String> {
        let start = self.position();
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| Error::malformed(start, format!("invalid UTF-8: {}", e)))
    }

    /// Read a 4-byte float.
    pub fn read_f32(&mut self) -> Result<f32> {
        let start = self.position();
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| Self::eof(start, "float"))
    }

    /// Read an 8-byte double.
    pub fn read_f64(&mut self) -> Result<f64> {
        let start = self.position();
        self.cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| Self::eof(start, "double"))
    }

    /// Read a decimal.
    pub fn read_decimal(&mut self) -> Result<Decimal> {
        let start = self.position();
        let unscaled = self
            .cursor
            .read_i64::<LittleEndian>()
            .map_err(|_| Self::eof(start, "decimal"))?;
        let scale = self
            .cursor
            .read_i32::<LittleEndian>()
            .map_err(|_| Self::eof(start, "decimal"))?;
        Ok(Decimal::new(unscaled, scale))
    }
}
