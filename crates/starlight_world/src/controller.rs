//! # Network Membership Controller
//!
//! The single writer of a network source's `enhanced` flag. It runs on the
//! world's step whenever a collector's structure match flips.

use tracing::info;

use crate::block::BlockGrid;
use crate::collector::CollectorCrystal;
use crate::network::WorldNetworkRegistry;

/// Applies structure match transitions to the network and the instance.
#[derive(Debug, Default)]
pub struct NetworkMembershipController {
    transitions: u64,
    sources_created: u64,
}

impl NetworkMembershipController {
    /// Creates a controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one transition of `collector` to `matched`.
    ///
    /// Looks up the collector's source (creating it if the registry lost
    /// it), sets `enhanced`, marks the registry dirty and schedules the
    /// collector for replication.
    pub fn on_structure_transition(
        &mut self,
        collector: &mut CollectorCrystal,
        network: &mut WorldNetworkRegistry,
        grid: &BlockGrid,
        matched: bool,
    ) {
        let pos = collector.pos();
        collector.set_enhanced(matched);

        match network.source_mut(pos) {
            Some(source) => source.set_enhanced(matched),
            None => {
                let source = collector.provide_source_node(grid.can_see_sky(pos.up()));
                network.add_source(source);
                self.sources_created += 1;
            }
        }
        network.mark_dirty();
        collector.mark_for_update();

        self.transitions += 1;
        info!(world = %network.world(), %pos, enhanced = matched, "collector enhancement changed");
    }

    /// Transitions handled so far.
    #[must_use]
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Sources that had to be created on transition.
    #[must_use]
    pub const fn sources_created(&self) -> u64 {
        self.sources_created
    }
}
