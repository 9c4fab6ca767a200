//! Research stages and progression tiers.
//!
//! Research stages go on the wire by a stable id that is independent of the
//! declaration order. Tiers go on the wire by ordinal.

/// A research stage the player has unlocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResearchProgression {
    /// First contact with starlight.
    Discovery,
    /// Basic crafting recipes.
    BasicCraft,
    /// Attunement to a major constellation.
    Attunement,
    /// Constellation-focused crafting.
    Constellation,
    /// Trait-bearing crafting.
    Radiance,
    /// Final stage.
    Brilliance,
}

impl ResearchProgression {
    /// Every stage, in id order.
    pub const ALL: [Self; 6] = [
        Self::Discovery,
        Self::BasicCraft,
        Self::Attunement,
        Self::Constellation,
        Self::Radiance,
        Self::Brilliance,
    ];

    /// Stable wire id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::Discovery => 0,
            Self::BasicCraft => 1,
            Self::Attunement => 2,
            Self::Constellation => 3,
            Self::Radiance => 4,
            Self::Brilliance => 5,
        }
    }

    /// Looks a stage up by wire id.
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::Discovery),
            1 => Some(Self::BasicCraft),
            2 => Some(Self::Attunement),
            3 => Some(Self::Constellation),
            4 => Some(Self::Radiance),
            5 => Some(Self::Brilliance),
            _ => None,
        }
    }
}

/// Overall progression tier. Ordered: later tiers compare greater.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgressionTier {
    /// Starting tier.
    #[default]
    Discovery,
    /// Basic crafting available.
    BasicCraft,
    /// Attuned.
    Attunement,
    /// Constellation crafting available.
    ConstellationCraft,
    /// Trait crafting available.
    TraitCraft,
    /// Final tier.
    Brilliance,
}

impl ProgressionTier {
    /// Every tier, in ordinal order.
    pub const ALL: [Self; 6] = [
        Self::Discovery,
        Self::BasicCraft,
        Self::Attunement,
        Self::ConstellationCraft,
        Self::TraitCraft,
        Self::Brilliance,
    ];

    /// Highest known tier.
    pub const HIGHEST: Self = Self::Brilliance;

    /// Wire ordinal.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> i32 {
        self as i32
    }

    /// Looks a tier up by ordinal.
    #[must_use]
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Maps any ordinal onto a known tier. Above the range clamps to
    /// [`HIGHEST`](Self::HIGHEST), below it to the starting tier.
    #[must_use]
    pub fn saturating_from_ordinal(ordinal: i32) -> Self {
        Self::from_ordinal(ordinal).unwrap_or(if ordinal < 0 {
            Self::Discovery
        } else {
            Self::HIGHEST
        })
    }
}
