//! # Starlight Networking - Progression Sync
//!
//! Replicates each player's progression from the authoritative server to
//! the client.
//!
//! ## Architecture
//!
//! - **Protocol**: big-endian field codec and the knowledge sync message
//! - **Progress**: the progression snapshot and its server-side mutators
//! - **Server**: authoritative per-player store, full-snapshot dispatch
//! - **Client**: decode on the transport thread, apply on the simulation step
//! - **Transport**: in-process channel transport
//!
//! ## Data Flow
//!
//! ```text
//! SERVER                                            CLIENT
//!   |                                                 |
//!   | progress_mut() ... sync(player)                 |
//!   |--- [state|known|seen|...|tier|exp] ------------>| SyncReceiver::receive
//!   |                                                 |   decode, queue (FIFO)
//!   |                                                 | ClientProgress::process_pending
//!   |                                                 |   full replace
//! ```
//!
//! The client NEVER merges. Every ADD is the complete snapshot.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use starlight_networking::{sync_pipeline, ChannelTransport, PlayerId, ProgressServer, SyncConfig};
//!
//! let transport = ChannelTransport::new();
//! let link = transport.connect(PlayerId(1), 64);
//! let mut server = ProgressServer::new(transport);
//! let (receiver, mut client) = sync_pipeline(&SyncConfig::default(), Arc::new(registry));
//!
//! server.progress_mut(PlayerId(1)).discover_constellation("orion");
//! server.sync(PlayerId(1))?;
//! for bytes in link.try_iter() {
//!     receiver.receive(&bytes);
//! }
//! client.process_pending();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod progress;
pub mod protocol;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use client::{sync_pipeline, ClientProgress, ClientSyncStats, ReceiveOutcome, SyncConfig, SyncReceiver};
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult, SyncError, SyncResult, TransportError};
pub use progress::{ProgressionSnapshot, ProgressionTier, ResearchProgression};
pub use protocol::{DecodeDiagnostic, DecodedSync, KnowledgeSync, PacketDeserializer, PacketSerializer, SyncState};
pub use server::{PlayerId, ProgressServer, ServerStats, SyncTransport};
pub use transport::{ChannelTransport, TransportStats};
