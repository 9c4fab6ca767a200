//! # Field Serialization
//!
//! Primitive field codec shared by every sync message.
//!
//! ## Layout rules
//!
//! - Multi-byte numbers are big-endian.
//! - Strings: `int32` byte length, then UTF-8 bytes.
//! - Sequences: `int32` count, then `count` elements. A count of `-1` means
//!   "not transmitted" and reads back as an empty collection.
//! - Optional values: marker byte, then the value only if the marker is `1`.
//! - Tag blobs: `int32` byte length, then the blob's own encoding. `-1` reads
//!   back as an empty compound.
//!
//! Writer and reader are used identically by both sides, so a field written
//! with `write_x` is always read with the matching `read_x`.

use starlight_shared::constants::{ABSENT_COUNT, ABSENT_MARKER, PRESENT_MARKER};
use starlight_shared::TagCompound;

use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};

/// Converts a host length into an `int32` prefix.
fn length_prefix(len: usize) -> EncodeResult<i32> {
    i32::try_from(len).map_err(|_| EncodeError::LengthOverflow(len))
}

/// Packet serializer - appends fields to a growable buffer.
///
/// Reuse one serializer across messages with [`reset`](Self::reset) to keep
/// the allocation.
#[derive(Debug, Default)]
pub struct PacketSerializer {
    buffer: Vec<u8>,
}

impl PacketSerializer {
    /// Creates an empty serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a serializer with preallocated space.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Resets the serializer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the serializer and returns the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a boolean as one byte.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Writes an i32 in big-endian format.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an f64 in big-endian format.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> EncodeResult<()> {
        self.write_i32(length_prefix(value.len())?);
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Writes a length-prefixed tag blob.
    pub fn write_blob(&mut self, value: &TagCompound) -> EncodeResult<()> {
        let bytes = value.to_bytes()?;
        self.write_i32(length_prefix(bytes.len())?);
        self.buffer.extend_from_slice(&bytes);
        Ok(())
    }

    /// Writes a present sequence: count, then each element via `write`.
    pub fn write_sequence<I, F>(&mut self, items: I, mut write: F) -> EncodeResult<()>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, I::Item) -> EncodeResult<()>,
    {
        let items = items.into_iter();
        self.write_i32(length_prefix(items.len())?);
        for item in items {
            write(self, item)?;
        }
        Ok(())
    }

    /// Writes the "not transmitted" sequence sentinel.
    #[inline]
    pub fn write_absent_sequence(&mut self) {
        self.write_i32(ABSENT_COUNT);
    }

    /// Writes an optional value: marker byte, then the value if present.
    pub fn write_optional<T, F>(&mut self, value: Option<T>, write: F) -> EncodeResult<()>
    where
        F: FnOnce(&mut Self, T) -> EncodeResult<()>,
    {
        match value {
            Some(value) => {
                self.write_i8(PRESENT_MARKER);
                write(self, value)
            }
            None => {
                self.write_i8(ABSENT_MARKER);
                Ok(())
            }
        }
    }
}

/// Packet deserializer - reads fields from a buffer.
///
/// Every read is bounds-checked; running off the end is a
/// [`DecodeError::Truncated`].
#[derive(Debug)]
pub struct PacketDeserializer<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketDeserializer<'a> {
    /// Creates a new deserializer from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the current read offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    fn take(&mut self, count: usize) -> DecodeResult<&'a [u8]> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(DecodeError::Truncated {
                needed: count,
                remaining,
            });
        }
        let buffer = self.buffer;
        let slice = &buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Reads a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        Ok(i8::from_be_bytes(self.take_array()?))
    }

    /// Reads a boolean; any non-zero byte is true.
    #[inline]
    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads an i32 in big-endian format.
    #[inline]
    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    /// Reads an f64 in big-endian format.
    #[inline]
    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> DecodeResult<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len))?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Reads a length-prefixed tag blob; `-1` yields an empty compound.
    pub fn read_blob(&mut self) -> DecodeResult<TagCompound> {
        let len = self.read_i32()?;
        if len == ABSENT_COUNT {
            return Ok(TagCompound::new());
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len))?;
        let bytes = self.take(len)?;
        Ok(TagCompound::from_bytes(bytes)?)
    }

    /// Reads a sequence count. `-1` reads as zero elements.
    pub fn read_count(&mut self) -> DecodeResult<usize> {
        let count = self.read_i32()?;
        if count == ABSENT_COUNT {
            return Ok(0);
        }
        usize::try_from(count).map_err(|_| DecodeError::InvalidLength(count))
    }

    /// Reads a sequence. `read` returns `None` for an element that must be
    /// skipped; the element's bytes are still consumed.
    pub fn read_sequence<T, F>(&mut self, mut read: F) -> DecodeResult<Vec<T>>
    where
        F: FnMut(&mut Self) -> DecodeResult<Option<T>>,
    {
        let count = self.read_count()?;
        // every element occupies at least one byte
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            if let Some(item) = read(self)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Reads an optional value. Only a marker of exactly `1` means present.
    pub fn read_optional<T, F>(&mut self, read: F) -> DecodeResult<Option<T>>
    where
        F: FnOnce(&mut Self) -> DecodeResult<T>,
    {
        if self.read_i8()? == PRESENT_MARKER {
            read(self).map(Some)
        } else {
            Ok(None)
        }
    }
}
