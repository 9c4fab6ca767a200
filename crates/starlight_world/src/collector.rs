//! # Collector Crystal
//!
//! The structure instance: a crystal bound to a constellation that feeds
//! starlight into the world's network. Celestial collectors additionally
//! watch for the enhancement platform underneath them.
//!
//! ## Persisted keys
//!
//! | key                      | type     |
//! |--------------------------|----------|
//! | `player`                 | bool     |
//! | `constellationName`      | string   |
//! | `constellationNametrait` | string   |
//! | `crystalProperties`      | compound |
//! | `collectorType`          | int      |
//! | `enhanced`               | bool     |
//!
//! Older saves stored the enhancement flag as `multiBlockPresent`. It is
//! read when `enhanced` is missing and never written.

use std::sync::Arc;

use starlight_shared::{BlockPos, Constellation, ReferenceResolver, TagCompound, WorldId};
use tracing::{debug, warn};

use crate::block::BlockGrid;
use crate::crystal::{CollectorType, CrystalProperties};
use crate::network::IndependentCrystalSource;
use crate::pattern::PatternBlockArray;
use crate::structure::StructureMatchCache;

const KEY_PLAYER: &str = "player";
const KEY_CONSTELLATION: &str = "constellationName";
const KEY_TRAIT: &str = "constellationNametrait";
const KEY_PROPERTIES: &str = "crystalProperties";
const KEY_TYPE: &str = "collectorType";
const KEY_ENHANCED: &str = "enhanced";
const KEY_ENHANCED_LEGACY: &str = "multiBlockPresent";

/// Replication record for observers.
#[derive(Clone, Debug, PartialEq)]
pub struct TileUpdate {
    /// Instance position.
    pub pos: BlockPos,
    /// Same layout as persistence.
    pub data: TagCompound,
}

/// What the world must do after a collector's step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectorStep {
    /// The collector asks to be removed.
    pub remove: bool,
    /// Structure match flipped to this value.
    pub transition: Option<bool>,
}

/// Collector crystal instance.
#[derive(Debug)]
pub struct CollectorCrystal {
    pos: BlockPos,
    constellation: Option<Constellation>,
    trait_constellation: Option<Constellation>,
    properties: CrystalProperties,
    player_made: bool,
    collector_type: CollectorType,
    enhanced: bool,
    ticks_existed: u32,
    structure: Option<StructureMatchCache>,
    needs_update: bool,
}

impl CollectorCrystal {
    /// Creates an uninitialised instance at `pos`.
    #[must_use]
    pub const fn new(pos: BlockPos) -> Self {
        Self {
            pos,
            constellation: None,
            trait_constellation: None,
            properties: CrystalProperties {
                size: 0,
                purity: 0,
                collective_capability: 0,
                fracturation: 0,
            },
            player_made: false,
            collector_type: CollectorType::RockCrystal,
            enhanced: false,
            ticks_existed: 0,
            structure: None,
            needs_update: false,
        }
    }

    /// Initialises a freshly placed collector and schedules replication.
    pub fn on_place(
        &mut self,
        constellation: Constellation,
        trait_constellation: Option<Constellation>,
        properties: CrystalProperties,
        player_made: bool,
        collector_type: CollectorType,
    ) {
        self.constellation = Some(constellation);
        self.trait_constellation = trait_constellation;
        self.properties = properties;
        self.player_made = player_made;
        self.collector_type = collector_type;
        self.mark_for_update();
    }

    /// Position.
    #[must_use]
    pub const fn pos(&self) -> BlockPos {
        self.pos
    }

    /// Bound constellation.
    #[must_use]
    pub const fn constellation(&self) -> Option<&Constellation> {
        self.constellation.as_ref()
    }

    /// Trait constellation.
    #[must_use]
    pub const fn trait_constellation(&self) -> Option<&Constellation> {
        self.trait_constellation.as_ref()
    }

    /// Crystal attributes.
    #[must_use]
    pub const fn properties(&self) -> &CrystalProperties {
        &self.properties
    }

    /// True if placed by a player rather than generated.
    #[must_use]
    pub const fn is_player_made(&self) -> bool {
        self.player_made
    }

    /// Collector kind.
    #[must_use]
    pub const fn collector_type(&self) -> CollectorType {
        self.collector_type
    }

    /// Enhancement flag as last set by the controller (or loaded).
    #[must_use]
    pub const fn is_enhanced(&self) -> bool {
        self.enhanced
    }

    /// Steps since load or placement.
    #[must_use]
    pub const fn ticks_existed(&self) -> u32 {
        self.ticks_existed
    }

    /// Structure match record, once the first evaluation ran.
    #[must_use]
    pub const fn structure(&self) -> Option<&StructureMatchCache> {
        self.structure.as_ref()
    }

    pub(crate) fn set_enhanced(&mut self, enhanced: bool) {
        self.enhanced = enhanced;
    }

    /// Schedules replication to observers.
    pub fn mark_for_update(&mut self) {
        self.needs_update = true;
    }

    /// Takes the pending replication record, if any.
    pub fn take_update(&mut self) -> Option<TileUpdate> {
        if !std::mem::take(&mut self.needs_update) {
            return None;
        }
        let mut data = TagCompound::new();
        self.write_to_tag(&mut data);
        Some(TileUpdate { pos: self.pos, data })
    }

    /// One server step.
    ///
    /// A collector still without a constellation after `grace_ticks` asks
    /// to be removed. Collectors with a required structure evaluate it.
    pub fn update(
        &mut self,
        world: WorldId,
        grid: &BlockGrid,
        pattern: &Arc<PatternBlockArray>,
        grace_ticks: u32,
    ) -> CollectorStep {
        self.ticks_existed = self.ticks_existed.saturating_add(1);

        if self.constellation.is_none() && self.ticks_existed > grace_ticks {
            debug!(%world, pos = %self.pos, "collector without constellation, removing");
            return CollectorStep {
                remove: true,
                transition: None,
            };
        }

        if !self.collector_type.has_required_structure() {
            return CollectorStep::default();
        }

        let (pos, enhanced) = (self.pos, self.enhanced);
        let cache = self
            .structure
            .get_or_insert_with(|| StructureMatchCache::new(world, pos, Arc::clone(pattern), enhanced));
        CollectorStep {
            remove: false,
            transition: cache.poll_transition(grid),
        }
    }

    /// Builds this collector's network descriptor.
    #[must_use]
    pub fn provide_source_node(&self, does_see_sky: bool) -> IndependentCrystalSource {
        IndependentCrystalSource::new(
            self.pos,
            self.constellation.clone(),
            self.trait_constellation.clone(),
            self.properties,
            self.collector_type,
            does_see_sky,
            !self.player_made,
            self.enhanced,
        )
    }

    /// Writes persisted state into `tag`.
    pub fn write_to_tag(&self, tag: &mut TagCompound) {
        tag.set_bool(KEY_PLAYER, self.player_made);
        if let Some(c) = &self.constellation {
            tag.set_string(KEY_CONSTELLATION, c.key());
        }
        if let Some(c) = &self.trait_constellation {
            tag.set_string(KEY_TRAIT, c.key());
        }
        let mut props = TagCompound::new();
        self.properties.write_to_tag(&mut props);
        tag.set_compound(KEY_PROPERTIES, props);
        tag.set_int(KEY_TYPE, self.collector_type.ordinal());
        tag.set_bool(KEY_ENHANCED, self.enhanced);
    }

    /// Restores a collector. Unknown keys and ordinals fall back to absent
    /// or the default kind with a warning.
    #[must_use]
    pub fn read_from_tag(pos: BlockPos, tag: &TagCompound, resolver: &dyn ReferenceResolver) -> Self {
        let mut collector = Self::new(pos);
        collector.player_made = tag.get_bool(KEY_PLAYER);

        collector.constellation = tag.get_string(KEY_CONSTELLATION).and_then(|key| {
            let resolved = resolver.constellation(key).filter(Constellation::is_weak);
            if resolved.is_none() {
                warn!(%pos, constellation = key, "collector constellation unknown");
            }
            resolved
        });
        collector.trait_constellation = tag.get_string(KEY_TRAIT).and_then(|key| {
            let resolved = resolver.constellation(key).filter(Constellation::is_minor);
            if resolved.is_none() {
                warn!(%pos, constellation = key, "collector trait unknown");
            }
            resolved
        });

        collector.properties = tag
            .get_compound(KEY_PROPERTIES)
            .map(CrystalProperties::read_from_tag)
            .unwrap_or_default();

        let ordinal = tag.get_int(KEY_TYPE);
        collector.collector_type = CollectorType::from_ordinal(ordinal).unwrap_or_else(|| {
            warn!(%pos, ordinal, "unknown collector type");
            CollectorType::default()
        });

        collector.enhanced = if tag.contains_key(KEY_ENHANCED) {
            tag.get_bool(KEY_ENHANCED)
        } else {
            tag.get_bool(KEY_ENHANCED_LEGACY)
        };
        collector
    }
}
