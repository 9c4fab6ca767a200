//! # Simulation World
//!
//! One world's blocks and collectors, stepped by a single thread.
//!
//! ## Step order
//!
//! 1. every collector updates (grace removal, structure evaluation)
//! 2. structure transitions go through the membership controller
//! 3. collectors that asked for removal are removed with their sources
//! 4. pending replication records are collected
//! 5. the network view is republished if the registry changed

use std::collections::BTreeMap;
use std::sync::Arc;

use starlight_shared::{BlockPos, Constellation, ReferenceResolver, Tag, TagCompound, WorldId};
use tracing::{debug, warn};

use crate::block::{Block, BlockGrid};
use crate::collector::{CollectorCrystal, TileUpdate};
use crate::controller::NetworkMembershipController;
use crate::crystal::{CollectorType, CrystalProperties};
use crate::error::{WorldError, WorldResult};
use crate::network::WorldNetworkRegistry;
use crate::pattern::PatternBlockArray;

/// Steps a collector without a constellation survives.
pub const DEFAULT_REMOVAL_GRACE_TICKS: u32 = 4;

/// World configuration.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Steps a collector may exist without a constellation.
    pub removal_grace_ticks: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            removal_grace_ticks: DEFAULT_REMOVAL_GRACE_TICKS,
        }
    }
}

/// Everything one step changed.
#[derive(Clone, Debug, Default)]
pub struct StepReport {
    /// Step number, starting at 1.
    pub tick: u64,
    /// Structure transitions handled, in position order.
    pub transitions: Vec<(BlockPos, bool)>,
    /// Collectors removed.
    pub removed: Vec<BlockPos>,
    /// Replication records for observers.
    pub updates: Vec<TileUpdate>,
    /// True if the network view was republished.
    pub published: bool,
}

/// One simulated world.
pub struct StarlightWorld {
    id: WorldId,
    config: WorldConfig,
    grid: BlockGrid,
    /// Ordered for deterministic stepping.
    collectors: BTreeMap<BlockPos, CollectorCrystal>,
    controller: NetworkMembershipController,
    enhancement_pattern: Arc<PatternBlockArray>,
    tick: u64,
}

impl StarlightWorld {
    /// Creates an empty world using the standard enhancement pattern.
    #[must_use]
    pub fn new(id: WorldId, config: WorldConfig) -> Self {
        Self::with_pattern(id, config, PatternBlockArray::collector_enhancement())
    }

    /// Creates an empty world with a custom enhancement pattern.
    #[must_use]
    pub fn with_pattern(id: WorldId, config: WorldConfig, pattern: PatternBlockArray) -> Self {
        Self {
            id,
            config,
            grid: BlockGrid::new(),
            collectors: BTreeMap::new(),
            controller: NetworkMembershipController::new(),
            enhancement_pattern: Arc::new(pattern),
            tick: 0,
        }
    }

    /// World id.
    #[must_use]
    pub const fn id(&self) -> WorldId {
        self.id
    }

    /// Steps run so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Block storage.
    #[must_use]
    pub const fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// Mutable block storage. Writing over a collector's block does not
    /// remove the collector.
    pub fn grid_mut(&mut self) -> &mut BlockGrid {
        &mut self.grid
    }

    /// Enhancement pattern collectors are checked against.
    #[must_use]
    pub fn enhancement_pattern(&self) -> &Arc<PatternBlockArray> {
        &self.enhancement_pattern
    }

    /// Membership controller (for its counters).
    #[must_use]
    pub const fn controller(&self) -> &NetworkMembershipController {
        &self.controller
    }

    /// Collector at `pos`.
    #[must_use]
    pub fn collector(&self, pos: BlockPos) -> Option<&CollectorCrystal> {
        self.collectors.get(&pos)
    }

    /// Number of collectors.
    #[must_use]
    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    /// Sets a block. Collector blocks are managed through
    /// [`place_collector`](Self::place_collector).
    ///
    /// # Errors
    ///
    /// Returns error if `pos` is outside the world or holds a collector.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) -> WorldResult<Block> {
        if self.collectors.contains_key(&pos) {
            return Err(WorldError::Occupied(pos));
        }
        self.grid.set_block(pos, block)
    }

    /// Places a collector and registers its network source.
    ///
    /// # Errors
    ///
    /// Returns error if `pos` is outside the world or already holds a
    /// collector.
    #[allow(clippy::too_many_arguments)]
    pub fn place_collector(
        &mut self,
        network: &mut WorldNetworkRegistry,
        pos: BlockPos,
        constellation: Constellation,
        trait_constellation: Option<Constellation>,
        properties: CrystalProperties,
        player_made: bool,
        collector_type: CollectorType,
    ) -> WorldResult<()> {
        if self.collectors.contains_key(&pos) {
            return Err(WorldError::Occupied(pos));
        }
        self.grid.set_block(pos, collector_type.block())?;

        let mut collector = CollectorCrystal::new(pos);
        collector.on_place(constellation, trait_constellation, properties, player_made, collector_type);
        // A restored source keeps its flag until the structure says otherwise.
        if let Some(existing) = network.source_at(pos) {
            collector.set_enhanced(existing.is_enhanced());
        }
        network.add_source(collector.provide_source_node(self.grid.can_see_sky(pos.up())));
        self.collectors.insert(pos, collector);
        debug!(world = %self.id, %pos, ?collector_type, "collector placed");
        Ok(())
    }

    /// Removes a collector and its network source.
    ///
    /// # Errors
    ///
    /// Returns error if no collector sits at `pos`.
    pub fn remove_collector(
        &mut self,
        network: &mut WorldNetworkRegistry,
        pos: BlockPos,
    ) -> WorldResult<CollectorCrystal> {
        let collector = self.collectors.remove(&pos).ok_or(WorldError::NoCollector(pos))?;
        self.grid.set_block(pos, Block::AIR)?;
        network.remove_source(pos);
        Ok(collector)
    }

    /// Runs one step against this world's network registry.
    pub fn step(&mut self, network: &mut WorldNetworkRegistry) -> StepReport {
        if network.world() != self.id {
            warn!(world = %self.id, network = %network.world(), "stepping with another world's network");
        }
        self.tick += 1;
        let mut report = StepReport {
            tick: self.tick,
            ..StepReport::default()
        };

        for (pos, collector) in &mut self.collectors {
            let outcome = collector.update(
                self.id,
                &self.grid,
                &self.enhancement_pattern,
                self.config.removal_grace_ticks,
            );
            if outcome.remove {
                report.removed.push(*pos);
                continue;
            }
            if let Some(matched) = outcome.transition {
                self.controller
                    .on_structure_transition(collector, network, &self.grid, matched);
                report.transitions.push((*pos, matched));
            }
        }

        for pos in &report.removed {
            if let Err(e) = self.remove_collector(network, *pos) {
                warn!(world = %self.id, %pos, error = %e, "collector removal failed");
            }
        }

        report.updates = self
            .collectors
            .values_mut()
            .filter_map(CollectorCrystal::take_update)
            .collect();

        report.published = network.publish();
        report
    }

    /// Serializes every collector.
    #[must_use]
    pub fn write_collectors(&self) -> TagCompound {
        let list = self
            .collectors
            .values()
            .map(|collector| {
                let mut entry = TagCompound::new();
                entry.insert("pos", Tag::IntArray(collector.pos().to_array().to_vec()));
                collector.write_to_tag(&mut entry);
                Tag::Compound(entry)
            })
            .collect();
        let mut tag = TagCompound::new();
        tag.insert("collectors", Tag::List(list));
        tag
    }

    /// Loads collectors written by [`write_collectors`](Self::write_collectors).
    /// Network sources are restored separately from the registry's own data.
    /// Returns how many collectors were loaded.
    pub fn read_collectors(&mut self, tag: &TagCompound, resolver: &dyn ReferenceResolver) -> usize {
        let mut loaded = 0;
        for entry in tag.get_list("collectors").unwrap_or_default() {
            let Tag::Compound(compound) = entry else {
                continue;
            };
            let pos = match compound.get("pos") {
                Some(Tag::IntArray(v)) if v.len() == 3 => BlockPos::new(v[0], v[1], v[2]),
                _ => {
                    warn!(world = %self.id, "collector entry without a valid position, skipped");
                    continue;
                }
            };
            let collector = CollectorCrystal::read_from_tag(pos, compound, resolver);
            if let Err(e) = self.grid.set_block(pos, collector.collector_type().block()) {
                warn!(world = %self.id, %pos, error = %e, "collector outside the world, skipped");
                continue;
            }
            self.collectors.insert(pos, collector);
            loaded += 1;
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlight_shared::{ConstellationKind, ReferenceRegistry};

    fn refs() -> ReferenceRegistry {
        let mut r = ReferenceRegistry::new();
        r.register_constellation("armara", ConstellationKind::Major);
        r
    }

    #[test]
    fn test_place_registers_source() {
        let refs = refs();
        let mut world = StarlightWorld::new(WorldId(0), WorldConfig::default());
        let mut network = WorldNetworkRegistry::new(WorldId(0));
        let pos = BlockPos::new(8, 64, 8);
        world
            .place_collector(
                &mut network,
                pos,
                refs.constellation("armara").unwrap(),
                None,
                CrystalProperties::max_celestial(),
                true,
                CollectorType::CelestialCrystal,
            )
            .unwrap();

        assert_eq!(world.grid().get_block(pos), Block::CELESTIAL_COLLECTOR);
        assert!(network.contains(pos));
        assert_eq!(world.set_block(pos, Block::AIR), Err(WorldError::Occupied(pos)));

        let report = world.step(&mut network);
        assert_eq!(report.updates.len(), 1);
        assert!(report.published);
        assert_eq!(network.view().is_enhanced(pos), Some(false));
    }

    #[test]
    fn test_place_over_stale_enhanced_source() {
        let refs = refs();
        let mut world = StarlightWorld::new(WorldId(0), WorldConfig::default());
        let mut network = WorldNetworkRegistry::new(WorldId(0));
        let pos = BlockPos::new(8, 64, 8);
        let mut stale = CollectorCrystal::new(pos);
        stale.set_enhanced(true);
        network.add_source(stale.provide_source_node(true));

        world
            .place_collector(
                &mut network,
                pos,
                refs.constellation("armara").unwrap(),
                None,
                CrystalProperties::max_celestial(),
                true,
                CollectorType::CelestialCrystal,
            )
            .unwrap();
        assert_eq!(network.source_at(pos).map(|s| s.is_enhanced()), Some(true));

        let report = world.step(&mut network);
        assert_eq!(report.transitions, vec![(pos, false)]);
        assert_eq!(network.view().is_enhanced(pos), Some(false));
        assert!(!world.collector(pos).unwrap().is_enhanced());
        for _ in 0..5 {
            assert!(world.step(&mut network).transitions.is_empty());
        }
    }

    #[test]
    fn test_collector_without_constellation_removed() {
        let refs = refs();
        let mut world = StarlightWorld::new(WorldId(0), WorldConfig::default());
        let mut network = WorldNetworkRegistry::new(WorldId(0));

        let mut saved = TagCompound::new();
        let mut entry = TagCompound::new();
        entry.insert("pos", Tag::IntArray(vec![0, 64, 0]));
        saved.insert("collectors", Tag::List(vec![Tag::Compound(entry)]));
        assert_eq!(world.read_collectors(&saved, &refs), 1);

        for _ in 0..4 {
            assert!(world.step(&mut network).removed.is_empty());
        }
        let report = world.step(&mut network);
        assert_eq!(report.removed, vec![BlockPos::new(0, 64, 0)]);
        assert_eq!(world.collector_count(), 0);
        assert!(world.grid().get_block(BlockPos::new(0, 64, 0)).is_air());
    }
}
