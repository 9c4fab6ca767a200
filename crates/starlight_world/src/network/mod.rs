//! # Transmission Network Registry
//!
//! Per-world arena of independent source descriptors, addressed by
//! position.
//!
//! ## Ownership
//!
//! - One registry per world, mutated only from that world's step
//! - `enhanced` is written only by the
//!   [`NetworkMembershipController`](crate::controller::NetworkMembershipController)
//! - Everyone else reads through a published [`NetworkView`]
//!
//! Any change marks the registry dirty twice over: once for persistence
//! (`take_dirty`) and once for the next `publish`.

mod source;
mod view;

pub use source::IndependentCrystalSource;
pub use view::NetworkView;

use std::collections::HashMap;

use starlight_shared::{BlockPos, ReferenceResolver, Tag, TagCompound, WorldId};
use tracing::{debug, warn};

/// Network registry of one world.
pub struct WorldNetworkRegistry {
    world: WorldId,
    sources: HashMap<BlockPos, IndependentCrystalSource>,
    /// Needs saving.
    dirty: bool,
    /// Needs publishing.
    view_stale: bool,
    view: NetworkView,
}

impl WorldNetworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(world: WorldId) -> Self {
        Self {
            world,
            sources: HashMap::new(),
            dirty: false,
            view_stale: false,
            view: NetworkView::default(),
        }
    }

    /// Owning world.
    #[must_use]
    pub const fn world(&self) -> WorldId {
        self.world
    }

    /// Source at `pos`.
    #[must_use]
    pub fn source_at(&self, pos: BlockPos) -> Option<&IndependentCrystalSource> {
        self.sources.get(&pos)
    }

    /// True if a source sits at `pos`.
    #[must_use]
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.sources.contains_key(&pos)
    }

    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True if there are no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All sources, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &IndependentCrystalSource> {
        self.sources.values()
    }

    /// Adds or replaces the source at its position. A replaced source
    /// keeps its `enhanced` flag.
    pub(crate) fn add_source(
        &mut self,
        mut source: IndependentCrystalSource,
    ) -> Option<IndependentCrystalSource> {
        if let Some(existing) = self.sources.get(&source.pos()) {
            source.set_enhanced(existing.is_enhanced());
        }
        debug!(world = %self.world, pos = %source.pos(), "network source added");
        self.mark_dirty();
        self.sources.insert(source.pos(), source)
    }

    /// Removes the source at `pos`.
    pub fn remove_source(&mut self, pos: BlockPos) -> Option<IndependentCrystalSource> {
        let removed = self.sources.remove(&pos);
        if removed.is_some() {
            debug!(world = %self.world, %pos, "network source removed");
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn source_mut(&mut self, pos: BlockPos) -> Option<&mut IndependentCrystalSource> {
        self.sources.get_mut(&pos)
    }

    /// Schedules persistence and publication.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.view_stale = true;
    }

    /// True if unsaved changes exist.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears and returns the persistence flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Publishes the current sources to the view if anything changed since
    /// the last publish. Returns whether it published.
    pub fn publish(&mut self) -> bool {
        if !self.view_stale {
            return false;
        }
        self.view.publish(self.sources.clone());
        self.view_stale = false;
        true
    }

    /// Handle to the published view.
    #[must_use]
    pub fn view(&self) -> NetworkView {
        self.view.clone()
    }

    /// Serializes every source.
    #[must_use]
    pub fn write_to_tag(&self) -> TagCompound {
        let mut positions: Vec<_> = self.sources.keys().copied().collect();
        positions.sort_unstable();
        let list = positions
            .iter()
            .filter_map(|pos| self.sources.get(pos))
            .map(|source| Tag::Compound(source.write_to_tag()))
            .collect();

        let mut tag = TagCompound::new();
        tag.set_int("world", self.world.0);
        tag.insert("sources", Tag::List(list));
        tag
    }

    /// Restores a registry. Malformed entries are skipped.
    #[must_use]
    pub fn read_from_tag(world: WorldId, tag: &TagCompound, resolver: &dyn ReferenceResolver) -> Self {
        let stored = tag.get_int("world");
        if stored != world.0 {
            warn!(%world, stored, "network data saved under another world id");
        }
        let mut registry = Self::new(world);
        for entry in tag.get_list("sources").unwrap_or_default() {
            let Tag::Compound(compound) = entry else {
                continue;
            };
            if let Some(source) = IndependentCrystalSource::read_from_tag(compound, resolver) {
                registry.sources.insert(source.pos(), source);
            }
        }
        registry.view_stale = true;
        registry
    }
}

/// Every world's network registry.
#[derive(Default)]
pub struct NetworkRegistries {
    worlds: HashMap<WorldId, WorldNetworkRegistry>,
}

impl NetworkRegistries {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of `world`, created empty on first access.
    pub fn get_or_create(&mut self, world: WorldId) -> &mut WorldNetworkRegistry {
        self.worlds
            .entry(world)
            .or_insert_with(|| WorldNetworkRegistry::new(world))
    }

    /// Registry of `world`, if it exists.
    #[must_use]
    pub fn get(&self, world: WorldId) -> Option<&WorldNetworkRegistry> {
        self.worlds.get(&world)
    }

    /// Installs a registry, e.g. one restored from storage.
    pub fn insert(&mut self, registry: WorldNetworkRegistry) -> Option<WorldNetworkRegistry> {
        self.worlds.insert(registry.world(), registry)
    }

    /// Drops a world's registry.
    pub fn remove(&mut self, world: WorldId) -> Option<WorldNetworkRegistry> {
        self.worlds.remove(&world)
    }

    /// Worlds whose registry needs saving; clears their flags.
    pub fn take_dirty_worlds(&mut self) -> Vec<WorldId> {
        let mut dirty: Vec<WorldId> = self
            .worlds
            .values_mut()
            .filter_map(|r| r.take_dirty().then_some(r.world()))
            .collect();
        dirty.sort_unstable();
        dirty
    }
}
