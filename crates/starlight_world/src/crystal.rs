//! Crystal kinds and attributes shared by collectors and network sources.

use starlight_shared::TagCompound;

/// Kind of collector crystal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectorType {
    /// Natural rock crystal. Has no required structure.
    #[default]
    RockCrystal,
    /// Celestial crystal. Becomes enhanced on the collector platform.
    CelestialCrystal,
}

impl CollectorType {
    /// Persisted ordinal.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> i32 {
        match self {
            Self::RockCrystal => 0,
            Self::CelestialCrystal => 1,
        }
    }

    /// Looks a type up by ordinal.
    #[must_use]
    pub const fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::RockCrystal),
            1 => Some(Self::CelestialCrystal),
            _ => None,
        }
    }

    /// True if this kind has a required structure.
    #[inline]
    #[must_use]
    pub const fn has_required_structure(self) -> bool {
        matches!(self, Self::CelestialCrystal)
    }

    /// Block placed for this kind.
    #[must_use]
    pub const fn block(self) -> crate::block::Block {
        match self {
            Self::RockCrystal => crate::block::Block::ROCK_COLLECTOR,
            Self::CelestialCrystal => crate::block::Block::CELESTIAL_COLLECTOR,
        }
    }
}

/// Physical attributes of a crystal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CrystalProperties {
    /// Size; caps the amount collected.
    pub size: i32,
    /// Purity, 0..=100.
    pub purity: i32,
    /// Collective capability, 0..=100.
    pub collective_capability: i32,
    /// Accumulated fracture damage.
    pub fracturation: i32,
}

impl CrystalProperties {
    /// Maximum size of a rock crystal.
    pub const MAX_SIZE_ROCK: i32 = 400;
    /// Maximum size of a celestial crystal.
    pub const MAX_SIZE_CELESTIAL: i32 = 900;

    /// Creates properties, clamping every attribute into its range.
    #[must_use]
    pub fn new(size: i32, purity: i32, collective_capability: i32, fracturation: i32) -> Self {
        Self {
            size: size.clamp(0, Self::MAX_SIZE_CELESTIAL),
            purity: purity.clamp(0, 100),
            collective_capability: collective_capability.clamp(0, 100),
            fracturation: fracturation.clamp(0, 100),
        }
    }

    /// Best possible celestial crystal.
    #[must_use]
    pub const fn max_celestial() -> Self {
        Self {
            size: Self::MAX_SIZE_CELESTIAL,
            purity: 100,
            collective_capability: 100,
            fracturation: 0,
        }
    }

    /// Writes the attributes into `tag`.
    pub fn write_to_tag(&self, tag: &mut TagCompound) {
        tag.set_int("size", self.size);
        tag.set_int("purity", self.purity);
        tag.set_int("collect", self.collective_capability);
        tag.set_int("fract", self.fracturation);
    }

    /// Reads attributes; missing keys read as 0.
    #[must_use]
    pub fn read_from_tag(tag: &TagCompound) -> Self {
        Self {
            size: tag.get_int("size"),
            purity: tag.get_int("purity"),
            collective_capability: tag.get_int("collect"),
            fracturation: tag.get_int("fract"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_type_ordinals() {
        assert_eq!(CollectorType::RockCrystal.ordinal(), 0);
        assert_eq!(CollectorType::from_ordinal(1), Some(CollectorType::CelestialCrystal));
        assert_eq!(CollectorType::from_ordinal(2), None);
        assert!(!CollectorType::RockCrystal.has_required_structure());
    }

    #[test]
    fn test_properties_tag_roundtrip() {
        let props = CrystalProperties::new(350, 80, 65, 3);
        let mut tag = TagCompound::new();
        props.write_to_tag(&mut tag);
        assert_eq!(CrystalProperties::read_from_tag(&tag), props);
    }

    #[test]
    fn test_clamped() {
        let props = CrystalProperties::new(5_000, 140, -2, 0);
        assert_eq!(props.size, CrystalProperties::MAX_SIZE_CELESTIAL);
        assert_eq!(props.purity, 100);
        assert_eq!(props.collective_capability, 0);
    }
}
