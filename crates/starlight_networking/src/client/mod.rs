//! # Sync Client
//!
//! Client-side half of progression sync, split across two contexts.
//!
//! ## Architecture
//!
//! ```text
//!  transport thread                 simulation step
//! ┌──────────────────┐  bounded   ┌────────────────────────┐
//! │  SyncReceiver    │  FIFO      │  ClientProgress        │
//! │  decode bytes ───┼──────────> │  process_pending()     │
//! │  (never applies) │  channel   │  apply, in order       │
//! └──────────────────┘            └────────────────────────┘
//! ```
//!
//! The receiver never touches the local snapshot. A message is either
//! applied completely on the simulation step or dropped (decode failure,
//! full queue); it is never half-applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use starlight_shared::{ReferenceResolver, DEFAULT_SYNC_QUEUE_CAPACITY};
use tracing::{debug, warn};

use crate::progress::ProgressionSnapshot;
use crate::protocol::{KnowledgeSync, SyncState};

/// Client sync configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Messages the hand-off queue holds before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_SYNC_QUEUE_CAPACITY,
        }
    }
}

/// Counters shared by both halves.
#[derive(Debug, Default)]
struct SyncCounters {
    received: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_queue_full: AtomicU64,
    applied: AtomicU64,
}

/// Point-in-time copy of the client sync counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientSyncStats {
    /// Payloads handed to [`SyncReceiver::receive`].
    pub received: u64,
    /// Payloads that failed to decode.
    pub dropped_malformed: u64,
    /// Decoded messages dropped because the queue was full or closed.
    pub dropped_queue_full: u64,
    /// Messages applied to the local snapshot.
    pub applied: u64,
}

/// What happened to one received payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Decoded and queued; `diagnostics` values were dropped while decoding.
    Queued {
        /// Number of dropped values.
        diagnostics: usize,
    },
    /// Could not be decoded; discarded.
    Malformed,
    /// Decoded but the queue was full or closed; discarded.
    Dropped,
}

/// Builds the two halves of a client sync pipeline.
#[must_use]
pub fn sync_pipeline(
    config: &SyncConfig,
    resolver: Arc<dyn ReferenceResolver>,
) -> (SyncReceiver, ClientProgress) {
    let (tx, rx) = bounded(config.queue_capacity.max(1));
    let counters = Arc::new(SyncCounters::default());
    let receiver = SyncReceiver {
        resolver,
        queue: tx,
        counters: Arc::clone(&counters),
    };
    let progress = ClientProgress {
        snapshot: ProgressionSnapshot::new(),
        queue: rx,
        counters,
    };
    (receiver, progress)
}

/// Transport-side half: decodes and enqueues.
pub struct SyncReceiver {
    resolver: Arc<dyn ReferenceResolver>,
    queue: Sender<KnowledgeSync>,
    counters: Arc<SyncCounters>,
}

impl SyncReceiver {
    /// Decodes one payload and queues it for the next simulation step.
    pub fn receive(&self, bytes: &[u8]) -> ReceiveOutcome {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let decoded = match KnowledgeSync::decode(bytes, self.resolver.as_ref()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, len = bytes.len(), "discarding malformed knowledge sync");
                self.counters.dropped_malformed.fetch_add(1, Ordering::Relaxed);
                return ReceiveOutcome::Malformed;
            }
        };

        let diagnostics = decoded.diagnostics.len();
        match self.queue.try_send(decoded.message) {
            Ok(()) => ReceiveOutcome::Queued { diagnostics },
            Err(TrySendError::Full(_)) => {
                warn!("sync queue full, dropping knowledge sync");
                self.counters.dropped_queue_full.fetch_add(1, Ordering::Relaxed);
                ReceiveOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("client progress gone, dropping knowledge sync");
                self.counters.dropped_queue_full.fetch_add(1, Ordering::Relaxed);
                ReceiveOutcome::Dropped
            }
        }
    }
}

/// Simulation-side half: owns the local snapshot.
pub struct ClientProgress {
    snapshot: ProgressionSnapshot,
    queue: Receiver<KnowledgeSync>,
    counters: Arc<SyncCounters>,
}

impl ClientProgress {
    /// Local progression as last applied.
    #[must_use]
    pub const fn snapshot(&self) -> &ProgressionSnapshot {
        &self.snapshot
    }

    /// Messages waiting to be applied.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Applies every queued message in arrival order. Returns how many.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.queue.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    /// Applies one message.
    ///
    /// ADD replaces every field. The sticky attuned flag is the OR of the
    /// local flag, the received flag and whether an attunement arrived.
    /// WIPE installs a fresh snapshot, sticky flag included.
    pub fn apply(&mut self, message: KnowledgeSync) {
        match message.state() {
            SyncState::Add => {
                let Some(incoming) = message.into_snapshot() else {
                    return;
                };
                let was_once_attuned = self.snapshot.was_once_attuned
                    || incoming.was_once_attuned
                    || incoming.attunement.is_some();
                self.snapshot = incoming;
                self.snapshot.was_once_attuned = was_once_attuned;
            }
            SyncState::Wipe => {
                self.snapshot = ProgressionSnapshot::new();
            }
        }
        self.counters.applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time counters.
    #[must_use]
    pub fn stats(&self) -> ClientSyncStats {
        ClientSyncStats {
            received: self.counters.received.load(Ordering::Relaxed),
            dropped_malformed: self.counters.dropped_malformed.load(Ordering::Relaxed),
            dropped_queue_full: self.counters.dropped_queue_full.load(Ordering::Relaxed),
            applied: self.counters.applied.load(Ordering::Relaxed),
        }
    }
}
