//! # Networking Errors
//!
//! Hard failures only. A key that fails to resolve is not an error; it is
//! reported as a [`DecodeDiagnostic`](crate::protocol::DecodeDiagnostic) and
//! decoding carries on.

use starlight_shared::TagError;
use thiserror::Error;

use crate::server::PlayerId;

/// A message that cannot be decoded at all. The whole message is discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended in the middle of a field.
    #[error("buffer truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the field required.
        needed: usize,
        /// Bytes that were left.
        remaining: usize,
    },

    /// A length or count below the `-1` sentinel, or a negative string length.
    #[error("invalid length {0}")]
    InvalidLength(i32),

    /// String bytes that are not UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,

    /// First byte is not a known sync state.
    #[error("unknown sync state {0}")]
    UnknownState(u8),

    /// The perk data blob is malformed.
    #[error("malformed perk data: {0}")]
    Tag(#[from] TagError),
}

/// A value that cannot be represented on the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A string, blob or collection longer than an `int32` prefix allows.
    #[error("length {0} does not fit an int32 prefix")]
    LengthOverflow(usize),

    /// The perk data blob could not be written.
    #[error("perk data: {0}")]
    Tag(#[from] TagError),
}

/// Delivery failure reported by a [`SyncTransport`](crate::server::SyncTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No link registered for the player.
    #[error("{0} is not connected")]
    NotConnected(PlayerId),

    /// The player's outbound queue is full.
    #[error("outbound queue for {0} is full")]
    Full(PlayerId),

    /// The receiving side has gone away.
    #[error("link to {0} was closed")]
    Closed(PlayerId),
}

/// Anything that can stop a server-side sync.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Encoding failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Delivery failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result alias for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result alias for encoding.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Result alias for server-side sync.
pub type SyncResult<T> = Result<T, SyncError>;
