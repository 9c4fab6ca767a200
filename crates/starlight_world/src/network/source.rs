//! Network source descriptor for a collector crystal.

use starlight_shared::{BlockPos, Constellation, ReferenceResolver, Tag, TagCompound};
use tracing::warn;

use crate::crystal::{CollectorType, CrystalProperties};

/// An independent starlight source in the transmission network.
///
/// `enhanced` mirrors the last structure match transition of the owning
/// collector and is only written by the membership controller.
#[derive(Clone, Debug, PartialEq)]
pub struct IndependentCrystalSource {
    pos: BlockPos,
    constellation: Option<Constellation>,
    trait_constellation: Option<Constellation>,
    properties: CrystalProperties,
    collector_type: CollectorType,
    does_see_sky: bool,
    has_been_linked: bool,
    enhanced: bool,
}

impl IndependentCrystalSource {
    /// Creates a descriptor. Only collectors build these, so the flag
    /// always starts from the collector's own state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub(crate) const fn new(
        pos: BlockPos,
        constellation: Option<Constellation>,
        trait_constellation: Option<Constellation>,
        properties: CrystalProperties,
        collector_type: CollectorType,
        does_see_sky: bool,
        has_been_linked: bool,
        enhanced: bool,
    ) -> Self {
        Self {
            pos,
            constellation,
            trait_constellation,
            properties,
            collector_type,
            does_see_sky,
            has_been_linked,
            enhanced,
        }
    }

    /// Position of the owning collector.
    #[must_use]
    pub const fn pos(&self) -> BlockPos {
        self.pos
    }

    /// Constellation the source emits.
    #[must_use]
    pub const fn constellation(&self) -> Option<&Constellation> {
        self.constellation.as_ref()
    }

    /// Trait constellation, if any.
    #[must_use]
    pub const fn trait_constellation(&self) -> Option<&Constellation> {
        self.trait_constellation.as_ref()
    }

    /// Crystal attributes.
    #[must_use]
    pub const fn properties(&self) -> &CrystalProperties {
        &self.properties
    }

    /// Crystal kind.
    #[must_use]
    pub const fn collector_type(&self) -> CollectorType {
        self.collector_type
    }

    /// Sky visibility when the descriptor was built.
    #[must_use]
    pub const fn does_see_sky(&self) -> bool {
        self.does_see_sky
    }

    /// True for naturally generated (linked) collectors.
    #[must_use]
    pub const fn has_been_linked(&self) -> bool {
        self.has_been_linked
    }

    /// Enhancement flag.
    #[must_use]
    pub const fn is_enhanced(&self) -> bool {
        self.enhanced
    }

    pub(crate) fn set_enhanced(&mut self, enhanced: bool) {
        self.enhanced = enhanced;
    }

    /// Writes the descriptor into a fresh compound.
    #[must_use]
    pub fn write_to_tag(&self) -> TagCompound {
        let mut tag = TagCompound::new();
        tag.insert("pos", Tag::IntArray(self.pos.to_array().to_vec()));
        if let Some(c) = &self.constellation {
            tag.set_string("constellation", c.key());
        }
        if let Some(c) = &self.trait_constellation {
            tag.set_string("trait", c.key());
        }
        let mut props = TagCompound::new();
        self.properties.write_to_tag(&mut props);
        tag.set_compound("crystalProperties", props);
        tag.set_int("collectorType", self.collector_type.ordinal());
        tag.set_bool("seesSky", self.does_see_sky);
        tag.set_bool("linked", self.has_been_linked);
        tag.set_bool("enhanced", self.enhanced);
        tag
    }

    /// Reads a descriptor. Returns `None` if the position is missing or
    /// malformed; unknown constellation keys read as absent.
    #[must_use]
    pub fn read_from_tag(tag: &TagCompound, resolver: &dyn ReferenceResolver) -> Option<Self> {
        let pos = match tag.get("pos") {
            Some(Tag::IntArray(v)) if v.len() == 3 => BlockPos::new(v[0], v[1], v[2]),
            _ => {
                warn!("network source without a valid position, skipped");
                return None;
            }
        };
        let resolve = |key: &str| {
            tag.get_string(key).and_then(|name| {
                let resolved = resolver.constellation(name);
                if resolved.is_none() {
                    warn!(%pos, constellation = name, "unknown constellation on network source");
                }
                resolved
            })
        };
        let collector_type = CollectorType::from_ordinal(tag.get_int("collectorType")).unwrap_or_default();
        let properties = tag
            .get_compound("crystalProperties")
            .map(CrystalProperties::read_from_tag)
            .unwrap_or_default();

        Some(Self {
            pos,
            constellation: resolve("constellation"),
            trait_constellation: resolve("trait"),
            properties,
            collector_type,
            does_see_sky: tag.get_bool("seesSky"),
            has_been_linked: tag.get_bool("linked"),
            enhanced: tag.get_bool("enhanced"),
        })
    }
}
