//! # Transport Layer
//!
//! In-process transport used by the simulation harness and tests.
//!
//! Each connected player gets a bounded crossbeam channel; the server side
//! pushes encoded messages into it and the client side (usually another
//! thread) pulls them out and feeds a
//! [`SyncReceiver`](crate::client::SyncReceiver).

use std::collections::HashMap;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::TransportError;
use crate::server::{PlayerId, SyncTransport};

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportStats {
    /// Packets sent.
    pub packets_sent: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Send errors.
    pub send_errors: u64,
}

/// Channel-backed [`SyncTransport`].
#[derive(Default)]
pub struct ChannelTransport {
    links: RwLock<HashMap<PlayerId, Sender<Vec<u8>>>>,
    stats: RwLock<TransportStats>,
}

impl ChannelTransport {
    /// Creates a transport with no links.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a link for `player` and returns the client end. Reconnecting
    /// replaces the previous link. A capacity of zero is raised to one so
    /// `send` never waits for a receiver.
    pub fn connect(&self, player: PlayerId, capacity: usize) -> Receiver<Vec<u8>> {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        self.links.write().insert(player, tx);
        debug!(%player, capacity, "link opened");
        rx
    }

    /// Closes a player's link. Messages already queued stay readable.
    pub fn disconnect(&self, player: PlayerId) -> bool {
        self.links.write().remove(&player).is_some()
    }

    /// True if the player has an open link.
    #[must_use]
    pub fn is_connected(&self, player: PlayerId) -> bool {
        self.links.read().contains_key(&player)
    }

    /// Transport statistics.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        *self.stats.read()
    }
}

impl SyncTransport for ChannelTransport {
    fn send(&self, player: PlayerId, payload: Vec<u8>) -> Result<(), TransportError> {
        let len = payload.len() as u64;
        let result = {
            let links = self.links.read();
            match links.get(&player) {
                None => Err(TransportError::NotConnected(player)),
                Some(tx) => tx.try_send(payload).map_err(|e| match e {
                    TrySendError::Full(_) => TransportError::Full(player),
                    TrySendError::Disconnected(_) => TransportError::Closed(player),
                }),
            }
        };

        let mut stats = self.stats.write();
        match result {
            Ok(()) => {
                stats.packets_sent += 1;
                stats.bytes_sent += len;
            }
            Err(_) => stats.send_errors += 1,
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_receive() {
        let transport = ChannelTransport::new();
        let rx = transport.connect(PlayerId(1), 4);
        transport.send(PlayerId(1), vec![1, 2, 3]).unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![1, 2, 3]);
        assert_eq!(transport.stats().bytes_sent, 3);
    }

    #[test]
    fn test_not_connected() {
        let transport = ChannelTransport::new();
        assert_eq!(
            transport.send(PlayerId(9), vec![0]),
            Err(TransportError::NotConnected(PlayerId(9)))
        );
    }

    #[test]
    fn test_full_and_closed() {
        let transport = ChannelTransport::new();
        let rx = transport.connect(PlayerId(1), 1);
        transport.send(PlayerId(1), vec![0]).unwrap();
        assert_eq!(
            transport.send(PlayerId(1), vec![1]),
            Err(TransportError::Full(PlayerId(1)))
        );
        drop(rx);
        assert_eq!(
            transport.send(PlayerId(1), vec![2]),
            Err(TransportError::Closed(PlayerId(1)))
        );
        assert_eq!(transport.stats().send_errors, 2);
    }

    #[test]
    fn test_zero_capacity_still_queues() {
        let transport = ChannelTransport::new();
        let rx = transport.connect(PlayerId(2), 0);
        transport.send(PlayerId(2), vec![7]).unwrap();
        assert_eq!(
            transport.send(PlayerId(2), vec![8]),
            Err(TransportError::Full(PlayerId(2)))
        );
        assert_eq!(rx.try_recv().unwrap(), vec![7]);
    }
}
