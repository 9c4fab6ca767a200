//! # Progress Server
//!
//! The authoritative copy of every player's progression.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     PROGRESS SERVER                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  gameplay ──progress_mut()──> ProgressionSnapshot        │
//! │                                      │                   │
//! │                                sync() / wipe()           │
//! │                                      │                   │
//! │                       KnowledgeSync::encode_into         │
//! │                                      │                   │
//! │                            SyncTransport::send ──> client│
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every sync carries the complete snapshot. There is no diffing.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use crate::error::{SyncResult, TransportError};
use crate::progress::ProgressionSnapshot;
use crate::protocol::{KnowledgeSync, PacketSerializer};

/// Identifies one player session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Delivers encoded sync messages to one player's client.
///
/// Framing and encryption belong to the implementation.
pub trait SyncTransport {
    /// Sends one encoded message.
    fn send(&self, player: PlayerId, payload: Vec<u8>) -> Result<(), TransportError>;
}

/// Server statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerStats {
    /// ADD messages sent.
    pub syncs_sent: u64,
    /// WIPE messages sent.
    pub wipes_sent: u64,
    /// Bytes handed to the transport.
    pub bytes_sent: u64,
    /// Sends the transport rejected.
    pub send_errors: u64,
}

/// Authoritative progression store.
pub struct ProgressServer<T: SyncTransport> {
    players: HashMap<PlayerId, ProgressionSnapshot>,
    transport: T,
    /// Reused for every encode.
    serializer: PacketSerializer,
    stats: ServerStats,
}

impl<T: SyncTransport> ProgressServer<T> {
    /// Creates an empty store sending through `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            players: HashMap::new(),
            transport,
            serializer: PacketSerializer::with_capacity(256),
            stats: ServerStats::default(),
        }
    }

    /// Current progression of a player, if a session ever started.
    #[must_use]
    pub fn progress(&self, player: PlayerId) -> Option<&ProgressionSnapshot> {
        self.players.get(&player)
    }

    /// Mutable progression, created empty on first access.
    pub fn progress_mut(&mut self, player: PlayerId) -> &mut ProgressionSnapshot {
        self.players.entry(player).or_insert_with(|| {
            debug!(%player, "creating empty progression");
            ProgressionSnapshot::new()
        })
    }

    /// Replaces a player's progression, e.g. after loading it from storage.
    pub fn load_progress(&mut self, player: PlayerId, snapshot: ProgressionSnapshot) {
        self.players.insert(player, snapshot);
    }

    /// Forgets a player and returns their progression.
    pub fn remove_player(&mut self, player: PlayerId) -> Option<ProgressionSnapshot> {
        self.players.remove(&player)
    }

    /// Number of players with progression.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Sends the player's complete progression. Returns the bytes sent.
    pub fn sync(&mut self, player: PlayerId) -> SyncResult<usize> {
        let snapshot = self.progress_mut(player).clone();
        let sent = self.dispatch(player, &KnowledgeSync::add(snapshot))?;
        self.stats.syncs_sent += 1;
        Ok(sent)
    }

    /// Resets the player's progression to empty and tells the client to do
    /// the same. Returns the bytes sent.
    pub fn wipe(&mut self, player: PlayerId) -> SyncResult<usize> {
        self.players.insert(player, ProgressionSnapshot::new());
        info!(%player, "progression wiped");
        let sent = self.dispatch(player, &KnowledgeSync::wipe())?;
        self.stats.wipes_sent += 1;
        Ok(sent)
    }

    fn dispatch(&mut self, player: PlayerId, message: &KnowledgeSync) -> SyncResult<usize> {
        message.encode_into(&mut self.serializer)?;
        let payload = self.serializer.as_slice().to_vec();
        let len = payload.len();
        if let Err(e) = self.transport.send(player, payload) {
            self.stats.send_errors += 1;
            return Err(e.into());
        }
        self.stats.bytes_sent += len as u64;
        debug!(%player, bytes = len, state = ?message.state(), "knowledge sync sent");
        Ok(len)
    }

    /// Transport in use.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Server statistics.
    #[must_use]
    pub const fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(PlayerId, Vec<u8>)>>,
    }

    impl SyncTransport for RecordingTransport {
        fn send(&self, player: PlayerId, payload: Vec<u8>) -> Result<(), TransportError> {
            self.sent.lock().push((player, payload));
            Ok(())
        }
    }

    struct ClosedTransport;

    impl SyncTransport for ClosedTransport {
        fn send(&self, player: PlayerId, _payload: Vec<u8>) -> Result<(), TransportError> {
            Err(TransportError::Closed(player))
        }
    }

    #[test]
    fn test_progress_created_on_first_access() {
        let mut server = ProgressServer::new(RecordingTransport::default());
        let player = PlayerId(7);
        assert!(server.progress(player).is_none());
        server.progress_mut(player).discover_constellation("orion");
        assert_eq!(server.player_count(), 1);
        assert!(server.progress(player).unwrap().has_discovered("orion"));
    }

    #[test]
    fn test_sync_sends_add() {
        let mut server = ProgressServer::new(RecordingTransport::default());
        let player = PlayerId(1);
        server.progress_mut(player).discover_constellation("orion");
        let sent = server.sync(player).unwrap();

        let log = server.transport().sent.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, player);
        assert_eq!(log[0].1.len(), sent);
        assert_eq!(log[0].1[0], 0);
        assert_eq!(server.stats().syncs_sent, 1);
    }

    #[test]
    fn test_wipe_resets_server_copy() {
        let mut server = ProgressServer::new(RecordingTransport::default());
        let player = PlayerId(1);
        server.progress_mut(player).grant_free_token("ritual");
        server.wipe(player).unwrap();

        assert_eq!(server.progress(player), Some(&ProgressionSnapshot::new()));
        assert_eq!(server.transport().sent.lock()[0].1[0], 1);
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut server = ProgressServer::new(ClosedTransport);
        let result = server.sync(PlayerId(3));
        assert!(result.is_err());
        assert_eq!(server.stats().send_errors, 1);
        assert_eq!(server.stats().syncs_sent, 0);
    }
}
