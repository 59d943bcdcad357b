//! Fixed-layout binary record codec.
//!
//! Every record travels in a length-prefixed envelope:
//!
//! ```text
//! +----------------+---------+---------+-----+
//! | total size u32 | field 0 | field 1 | ... |
//! +----------------+---------+---------+-----+
//! ```
//!
//! The size header is little-endian and includes its own four bytes. Fields
//! follow in declaration order with no tags. Integers are little-endian,
//! strings and byte blobs are `u32` length + data, lists are `u32` count +
//! elements.
//!
//! Optional fields are signalled in one of two ways, chosen per schema:
//!
//! - early truncation: trailing optionals are simply left out and the size
//!   header ends the record before them ([`WireReader::has_remaining`]);
//! - a presence bitmask byte written ahead of the optional fields.
//!
//! Decoding fails with [`RpcError::MalformedRecord`] on truncated input,
//! over-length input (bytes past the declared size) and on bytes left over
//! inside the envelope after the last field.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Result, RpcError};

/// Size of the total-size header in bytes.
pub const HEADER_LEN: usize = 4;

/// Largest encodable record, and largest string, blob or list inside one.
pub const MAX_LEN: usize = u32::MAX as usize;

/// A record with a fixed wire layout.
pub trait Record: Sized {
    /// Write the record's fields in declaration order.
    fn encode_fields(&self, w: &mut WireWriter);

    /// Read the record's fields in declaration order.
    fn decode_fields(r: &mut WireReader<'_>) -> Result<Self>;
}

/// Encode a record into a length-prefixed envelope.
///
/// # Panics
///
/// Panics if the record, or any length-prefixed field in it, exceeds
/// [`MAX_LEN`].
pub fn encode<R: Record>(record: &R) -> Bytes {
    // ---
    let mut w = WireWriter::new();
    record.encode_fields(&mut w);
    w.finish()
}

/// Decode a record from a length-prefixed envelope.
pub fn decode<R: Record>(buf: &[u8]) -> Result<R> {
    // ---
    let mut r = WireReader::frame(buf)?;
    let record = R::decode_fields(&mut r)?;

    if r.has_remaining() {
        return Err(malformed(format!(
            "{} unread bytes after last field",
            r.remaining()
        )));
    }
    Ok(record)
}

/// Length as carried in a `u32` prefix.
fn wire_len(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(len) => len,
        Err(_) => panic!("length {len} exceeds the {MAX_LEN} byte wire limit"),
    }
}

fn malformed(msg: impl Into<String>) -> RpcError {
    RpcError::MalformedRecord(msg.into())
}

/// Field writer backing [`encode`].
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    fn new() -> Self {
        // ---
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u32_le(0);
        Self { buf }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn put_bytes(&mut self, v: &[u8]) {
        // ---
        self.buf.put_u32_le(wire_len(v.len()));
        self.buf.put_slice(v);
    }

    pub fn put_str(&mut self, v: &str) {
        self.put_bytes(v.as_bytes());
    }

    pub fn put_u32_list(&mut self, v: &[u32]) {
        // ---
        self.buf.put_u32_le(wire_len(v.len()));
        for item in v {
            self.buf.put_u32_le(*item);
        }
    }

    /// Write a list of nested records, fields inlined.
    pub fn put_list<T: Record>(&mut self, items: &[T]) {
        // ---
        self.buf.put_u32_le(wire_len(items.len()));
        for item in items {
            item.encode_fields(self);
        }
    }

    fn finish(mut self) -> Bytes {
        // ---
        let total = wire_len(self.buf.len());
        self.buf[..HEADER_LEN].copy_from_slice(&total.to_le_bytes());
        self.buf.freeze()
    }
}

/// Field reader backing [`decode`], bounded by the envelope's size header.
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    // ---

    fn frame(buf: &'a [u8]) -> Result<Self> {
        // ---
        if buf.len() < HEADER_LEN {
            return Err(malformed(format!(
                "truncated header: {} of {HEADER_LEN} bytes",
                buf.len()
            )));
        }

        let declared = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        if declared < HEADER_LEN {
            return Err(malformed(format!("declared size {declared} below header size")));
        }
        if declared > buf.len() {
            return Err(malformed(format!(
                "truncated: declared {declared} bytes, got {}",
                buf.len()
            )));
        }
        if declared < buf.len() {
            return Err(malformed(format!(
                "over-length: declared {declared} bytes, got {}",
                buf.len()
            )));
        }

        Ok(Self {
            buf: &buf[HEADER_LEN..declared],
        })
    }

    /// True while unread fields remain; used for truncation-optional fields.
    pub fn has_remaining(&self) -> bool {
        !self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, n: usize, what: &str) -> Result<()> {
        // ---
        if self.buf.len() < n {
            return Err(malformed(format!(
                "truncated {what}: need {n} bytes, have {}",
                self.buf.len()
            )));
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        // ---
        self.ensure(1, "u8")?;
        Ok(self.buf.get_u8())
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        // ---
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(malformed(format!("invalid bool {other}"))),
        }
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        // ---
        self.ensure(4, "u32")?;
        Ok(self.buf.get_u32_le())
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        // ---
        self.ensure(4, "i32")?;
        Ok(self.buf.get_i32_le())
    }

    pub fn get_bytes(&mut self) -> Result<&'a [u8]> {
        // ---
        let len = self.get_u32()? as usize;
        self.ensure(len, "byte blob")?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn get_string(&mut self) -> Result<String> {
        // ---
        let raw = self.get_bytes()?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| malformed(format!("invalid utf-8: {e}")))
    }

    pub fn get_u32_list(&mut self) -> Result<Vec<u32>> {
        // ---
        let count = self.get_u32()? as usize;
        self.ensure(count.saturating_mul(4), "u32 list")?;
        Ok((0..count).map(|_| self.buf.get_u32_le()).collect())
    }

    /// Read a list of nested records written by [`WireWriter::put_list`].
    pub fn get_list<T: Record>(&mut self) -> Result<Vec<T>> {
        // ---
        let count = self.get_u32()? as usize;

        // every element occupies at least one byte
        self.ensure(count, "record list")?;

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode_fields(self)?);
        }
        Ok(items)
    }
}
