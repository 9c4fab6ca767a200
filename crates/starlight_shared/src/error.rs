//! # Shared Error Types
//!
//! Errors raised while reading or writing the structured tag blob.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a tag blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The buffer ended before the value was complete.
    #[error("tag data truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the reader asked for.
        needed: usize,
        /// Bytes that were left.
        remaining: usize,
    },

    /// A type id outside the known set.
    #[error("unknown tag type id {0}")]
    UnknownType(u8),

    /// A string payload that is not valid UTF-8.
    #[error("tag string is not valid utf-8")]
    InvalidUtf8,

    /// A list or array length below zero.
    #[error("negative tag length {0}")]
    NegativeLength(i32),

    /// Nesting deeper than the decoder accepts.
    #[error("tag nesting exceeds depth {0}")]
    DepthExceeded(usize),

    /// A list or array with more elements than the i32 length prefix holds.
    #[error("tag length {0} does not fit an i32")]
    LengthOverflow(usize),

    /// A key or string that does not fit the u16 length prefix.
    #[error("tag string of {0} bytes is too long")]
    StringTooLong(usize),

    /// A list whose elements do not share one type.
    #[error("tag list mixes element types")]
    MixedList,

    /// Bytes left over after the root compound.
    #[error("{0} trailing bytes after tag data")]
    TrailingBytes(usize),
}

/// Result type for tag operations.
pub type TagResult<T> = Result<T, TagError>;
