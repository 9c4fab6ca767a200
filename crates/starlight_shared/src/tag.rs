//! # Structured Tag Blob
//!
//! A self-describing key/value tree used for two things:
//!
//! - per-perk usage data carried inside the knowledge sync message
//! - persisted and replicated state of structure instances
//!
//! The sync codec treats an encoded compound as an uninterpreted byte span;
//! only this module knows the layout.
//!
//! ## Binary Layout (big-endian)
//!
//! ```text
//! compound := (type:u8 name:str payload)* 0x00
//! str      := len:u16 utf8[len]
//! list     := elem_type:u8 count:i32 payload[count]
//! ```

use std::collections::BTreeMap;

use crate::constants::MAX_TAG_DEPTH;
use crate::error::{TagError, TagResult};

const TYPE_END: u8 = 0;
const TYPE_BYTE: u8 = 1;
const TYPE_SHORT: u8 = 2;
const TYPE_INT: u8 = 3;
const TYPE_LONG: u8 = 4;
const TYPE_FLOAT: u8 = 5;
const TYPE_DOUBLE: u8 = 6;
const TYPE_BYTE_ARRAY: u8 = 7;
const TYPE_STRING: u8 = 8;
const TYPE_LIST: u8 = 9;
const TYPE_COMPOUND: u8 = 10;
const TYPE_INT_ARRAY: u8 = 11;

/// A single typed value inside a [`TagCompound`].
#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    /// Signed byte (also used for booleans).
    Byte(i8),
    /// Signed 16-bit integer.
    Short(i16),
    /// Signed 32-bit integer.
    Int(i32),
    /// Signed 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Raw bytes.
    ByteArray(Vec<u8>),
    /// UTF-8 string.
    String(String),
    /// Homogeneous list.
    List(Vec<Tag>),
    /// Nested compound.
    Compound(TagCompound),
    /// Array of 32-bit integers.
    IntArray(Vec<i32>),
}

impl Tag {
    /// Wire type id of this value.
    #[must_use]
    pub const fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => TYPE_BYTE,
            Self::Short(_) => TYPE_SHORT,
            Self::Int(_) => TYPE_INT,
            Self::Long(_) => TYPE_LONG,
            Self::Float(_) => TYPE_FLOAT,
            Self::Double(_) => TYPE_DOUBLE,
            Self::ByteArray(_) => TYPE_BYTE_ARRAY,
            Self::String(_) => TYPE_STRING,
            Self::List(_) => TYPE_LIST,
            Self::Compound(_) => TYPE_COMPOUND,
            Self::IntArray(_) => TYPE_INT_ARRAY,
        }
    }
}

/// Ordered key/value tree with get/set-by-key semantics.
///
/// Typed getters follow the lenient convention of the storage format: a
/// missing key or a value of another type reads as the type's zero value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagCompound {
    entries: BTreeMap<String, Tag>,
}

impl TagCompound {
    /// Creates an empty compound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous one under that key.
    pub fn insert(&mut self, key: impl Into<String>, tag: Tag) -> Option<Tag> {
        self.entries.insert(key.into(), tag)
    }

    /// Gets a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.remove(key)
    }

    /// Returns true if the key is present (of any type).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stores a boolean as a byte.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.insert(key, Tag::Byte(i8::from(value)));
    }

    /// Reads a boolean; missing reads as `false`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Tag::Byte(v)) if *v != 0)
    }

    /// Stores a 32-bit integer.
    pub fn set_int(&mut self, key: &str, value: i32) {
        self.insert(key, Tag::Int(value));
    }

    /// Reads a 32-bit integer; missing reads as `0`.
    #[must_use]
    pub fn get_int(&self, key: &str) -> i32 {
        match self.get(key) {
            Some(Tag::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Stores a 64-bit integer.
    pub fn set_long(&mut self, key: &str, value: i64) {
        self.insert(key, Tag::Long(value));
    }

    /// Reads a 64-bit integer; missing reads as `0`.
    #[must_use]
    pub fn get_long(&self, key: &str) -> i64 {
        match self.get(key) {
            Some(Tag::Long(v)) => *v,
            _ => 0,
        }
    }

    /// Stores a 32-bit float.
    pub fn set_float(&mut self, key: &str, value: f32) {
        self.insert(key, Tag::Float(value));
    }

    /// Reads a 32-bit float; missing reads as `0.0`.
    #[must_use]
    pub fn get_float(&self, key: &str) -> f32 {
        match self.get(key) {
            Some(Tag::Float(v)) => *v,
            _ => 0.0,
        }
    }

    /// Stores a 64-bit float.
    pub fn set_double(&mut self, key: &str, value: f64) {
        self.insert(key, Tag::Double(value));
    }

    /// Reads a 64-bit float; missing reads as `0.0`.
    #[must_use]
    pub fn get_double(&self, key: &str) -> f64 {
        match self.get(key) {
            Some(Tag::Double(v)) => *v,
            _ => 0.0,
        }
    }

    /// Stores a string.
    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.insert(key, Tag::String(value.into()));
    }

    /// Reads a string.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Tag::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Stores a nested compound.
    pub fn set_compound(&mut self, key: &str, value: TagCompound) {
        self.insert(key, Tag::Compound(value));
    }

    /// Reads a nested compound.
    #[must_use]
    pub fn get_compound(&self, key: &str) -> Option<&TagCompound> {
        match self.get(key) {
            Some(Tag::Compound(v)) => Some(v),
            _ => None,
        }
    }

    /// Reads a list.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<&[Tag]> {
        match self.get(key) {
            Some(Tag::List(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Encodes this compound into its binary layout.
    ///
    /// # Errors
    ///
    /// Returns error if a key or string exceeds the u16 length prefix or a
    /// list mixes element types.
    pub fn to_bytes(&self) -> TagResult<Vec<u8>> {
        let mut out = Vec::with_capacity(64);
        write_compound(&mut out, self)?;
        Ok(out)
    }

    /// Decodes a compound, rejecting trailing bytes.
    ///
    /// # Errors
    ///
    /// Returns error on truncated, malformed or too deeply nested data.
    pub fn from_bytes(data: &[u8]) -> TagResult<Self> {
        let mut reader = TagReader { data, position: 0 };
        let compound = reader.read_compound(0)?;
        let trailing = data.len() - reader.position;
        if trailing != 0 {
            return Err(TagError::TrailingBytes(trailing));
        }
        Ok(compound)
    }
}

fn write_str(out: &mut Vec<u8>, value: &str) -> TagResult<()> {
    let len = u16::try_from(value.len()).map_err(|_| TagError::StringTooLong(value.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn write_len(out: &mut Vec<u8>, len: usize) -> TagResult<()> {
    let len = i32::try_from(len).map_err(|_| TagError::LengthOverflow(len))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_compound(out: &mut Vec<u8>, compound: &TagCompound) -> TagResult<()> {
    for (key, tag) in &compound.entries {
        out.push(tag.type_id());
        write_str(out, key)?;
        write_payload(out, tag)?;
    }
    out.push(TYPE_END);
    Ok(())
}

fn write_payload(out: &mut Vec<u8>, tag: &Tag) -> TagResult<()> {
    match tag {
        Tag::Byte(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::ByteArray(bytes) => {
            write_len(out, bytes.len())?;
            out.extend_from_slice(bytes);
        }
        Tag::String(s) => write_str(out, s)?,
        Tag::List(items) => {
            let elem_type = items.first().map_or(TYPE_END, Tag::type_id);
            if items.iter().any(|t| t.type_id() != elem_type) {
                return Err(TagError::MixedList);
            }
            out.push(elem_type);
            write_len(out, items.len())?;
            for item in items {
                write_payload(out, item)?;
            }
        }
        Tag::Compound(c) => write_compound(out, c)?,
        Tag::IntArray(values) => {
            write_len(out, values.len())?;
            for v in values {
                out.extend_from_slice(&v.to_be_bytes());
            }
        }
    }
    Ok(())
}

struct TagReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> TagReader<'a> {
    fn take(&mut self, n: usize) -> TagResult<&'a [u8]> {
        let remaining = self.data.len() - self.position;
        if n > remaining {
            return Err(TagError::Truncated { needed: n, remaining });
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> TagResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn read_u8(&mut self) -> TagResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> TagResult<i32> {
        self.read_array().map(i32::from_be_bytes)
    }

    fn read_len(&mut self) -> TagResult<usize> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| TagError::NegativeLength(len))
    }

    fn read_str(&mut self) -> TagResult<String> {
        let len = usize::from(u16::from_be_bytes(self.read_array()?));
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| TagError::InvalidUtf8)
    }

    fn read_compound(&mut self, depth: usize) -> TagResult<TagCompound> {
        if depth > MAX_TAG_DEPTH {
            return Err(TagError::DepthExceeded(MAX_TAG_DEPTH));
        }
        let mut compound = TagCompound::new();
        loop {
            let type_id = self.read_u8()?;
            if type_id == TYPE_END {
                return Ok(compound);
            }
            let key = self.read_str()?;
            let tag = self.read_payload(type_id, depth + 1)?;
            compound.entries.insert(key, tag);
        }
    }

    fn read_payload(&mut self, type_id: u8, depth: usize) -> TagResult<Tag> {
        let tag = match type_id {
            TYPE_BYTE => Tag::Byte(i8::from_be_bytes(self.read_array()?)),
            TYPE_SHORT => Tag::Short(i16::from_be_bytes(self.read_array()?)),
            TYPE_INT => Tag::Int(self.read_i32()?),
            TYPE_LONG => Tag::Long(i64::from_be_bytes(self.read_array()?)),
            TYPE_FLOAT => Tag::Float(f32::from_be_bytes(self.read_array()?)),
            TYPE_DOUBLE => Tag::Double(f64::from_be_bytes(self.read_array()?)),
            TYPE_BYTE_ARRAY => {
                let len = self.read_len()?;
                Tag::ByteArray(self.take(len)?.to_vec())
            }
            TYPE_STRING => Tag::String(self.read_str()?),
            TYPE_LIST => {
                if depth > MAX_TAG_DEPTH {
                    return Err(TagError::DepthExceeded(MAX_TAG_DEPTH));
                }
                let elem_type = self.read_u8()?;
                let count = self.read_len()?;
                if elem_type == TYPE_END && count > 0 {
                    return Err(TagError::UnknownType(TYPE_END));
                }
                // every element takes at least one byte
                let mut items = Vec::with_capacity(count.min(self.data.len() - self.position));
                for _ in 0..count {
                    items.push(self.read_payload(elem_type, depth + 1)?);
                }
                Tag::List(items)
            }
            TYPE_COMPOUND => Tag::Compound(self.read_compound(depth)?),
            TYPE_INT_ARRAY => {
                let count = self.read_len()?;
                let bytes = self.take(count.saturating_mul(4))?;
                Tag::IntArray(
                    bytes
                        .chunks_exact(4)
                        .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            }
            other => return Err(TagError::UnknownType(other)),
        };
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagCompound {
        let mut inner = TagCompound::new();
        inner.set_int("purity", 90);
        inner.set_double("exp", 12.5);

        let mut tag = TagCompound::new();
        tag.set_bool("player", true);
        tag.set_string("constellationName", "astralsorcery.constellation.aevitas");
        tag.set_compound("crystalProperties", inner);
        tag.insert("history", Tag::List(vec![Tag::Int(1), Tag::Int(2)]));
        tag.insert("raw", Tag::ByteArray(vec![1, 2, 3]));
        tag.insert("ids", Tag::IntArray(vec![-1, 7]));
        tag.insert("s", Tag::Short(-3));
        tag.insert("l", Tag::Long(1 << 40));
        tag.insert("f", Tag::Float(0.25));
        tag
    }

    #[test]
    fn test_nested_round_trip() {
        let tag = sample();
        let bytes = tag.to_bytes().unwrap();
        assert_eq!(TagCompound::from_bytes(&bytes).unwrap(), tag);
    }

    #[test]
    fn test_lenient_getters() {
        let tag = sample();
        assert!(tag.get_bool("player"));
        assert!(!tag.get_bool("missing"));
        assert_eq!(tag.get_int("player"), 0);
        assert_eq!(tag.get_compound("crystalProperties").unwrap().get_int("purity"), 90);
        assert_eq!(tag.get_string("nope"), None);
    }

    #[test]
    fn test_empty_compound_is_single_end_byte() {
        assert_eq!(TagCompound::new().to_bytes().unwrap(), vec![0]);
    }

    #[test]
    fn test_truncated_data() {
        let bytes = sample().to_bytes().unwrap();
        let err = TagCompound::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, TagError::Truncated { .. }));
    }

    #[test]
    fn test_unknown_type() {
        let data = [42u8, 0, 1, b'a'];
        assert_eq!(TagCompound::from_bytes(&data), Err(TagError::UnknownType(42)));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert_eq!(TagCompound::from_bytes(&[0, 0]), Err(TagError::TrailingBytes(1)));
    }

    #[test]
    fn test_mixed_list_rejected() {
        let mut tag = TagCompound::new();
        tag.insert("bad", Tag::List(vec![Tag::Int(1), Tag::Byte(1)]));
        assert_eq!(tag.to_bytes(), Err(TagError::MixedList));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut out = Vec::new();
        let len = usize::try_from(i32::MAX).unwrap() + 1;
        assert_eq!(write_len(&mut out, len), Err(TagError::LengthOverflow(len)));
        assert!(out.is_empty());

        write_len(&mut out, 3).unwrap();
        assert_eq!(out, vec![0, 0, 0, 3]);
    }

    #[test]
    fn test_depth_bomb_rejected() {
        // compound -> compound -> ... without ever closing
        let mut data = Vec::new();
        for _ in 0..(MAX_TAG_DEPTH + 2) {
            data.extend_from_slice(&[TYPE_COMPOUND, 0, 1, b'c']);
        }
        let err = TagCompound::from_bytes(&data).unwrap_err();
        assert_eq!(err, TagError::DepthExceeded(MAX_TAG_DEPTH));
    }
}
