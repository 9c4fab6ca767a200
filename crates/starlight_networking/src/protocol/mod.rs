//! # Sync Protocol
//!
//! Binary layout of the progression sync message.
//!
//! ## Design Philosophy
//!
//! - Both sides read and write through the same field codec
//! - Absent is distinct from empty on the wire, but decodes to empty
//! - Enums travel by stable id, references by string key
//! - A key the receiver does not know costs one diagnostic, never the message

mod packets;
mod serialization;

pub use packets::{DecodeDiagnostic, DecodedSync, KnowledgeSync, SyncState};
pub use serialization::{PacketDeserializer, PacketSerializer};
