//! # Progression Snapshot
//!
//! One player's unlocked knowledge: discovered and seen constellations,
//! research stages, attunement, perks, free perk tokens, perk experience and
//! used sextant targets.
//!
//! The server mutates a snapshot through the methods below; the client only
//! ever replaces its copy wholesale from a sync message.

mod research;

pub use research::{ProgressionTier, ResearchProgression};

use std::collections::HashMap;

use starlight_shared::{Constellation, Perk, TagCompound, TargetObject};

/// Complete replicated progression of one player.
///
/// `Default` is the fresh, empty snapshot a new player starts with and the
/// state a WIPE installs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressionSnapshot {
    pub(crate) known_constellations: Vec<String>,
    pub(crate) seen_constellations: Vec<String>,
    pub(crate) research: Vec<ResearchProgression>,
    pub(crate) attunement: Option<Constellation>,
    pub(crate) tier: ProgressionTier,
    pub(crate) was_once_attuned: bool,
    pub(crate) perk_usage: HashMap<Perk, TagCompound>,
    pub(crate) free_tokens: Vec<String>,
    pub(crate) perk_exp: f64,
    pub(crate) used_targets: Vec<TargetObject>,
}

impl ProgressionSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // CONSTELLATIONS
    // =========================================================================

    /// Constellation keys in discovery order.
    #[must_use]
    pub fn known_constellations(&self) -> &[String] {
        &self.known_constellations
    }

    /// Constellation keys seen but not yet discovered.
    #[must_use]
    pub fn seen_constellations(&self) -> &[String] {
        &self.seen_constellations
    }

    /// Records a discovery. Returns false if it was already known.
    pub fn discover_constellation(&mut self, key: &str) -> bool {
        if self.has_discovered(key) {
            return false;
        }
        self.known_constellations.push(key.to_owned());
        true
    }

    /// Records a sighting. Returns false if it was already seen.
    pub fn memorize_constellation(&mut self, key: &str) -> bool {
        if self.has_seen(key) {
            return false;
        }
        self.seen_constellations.push(key.to_owned());
        true
    }

    /// True if the constellation has been discovered.
    #[must_use]
    pub fn has_discovered(&self, key: &str) -> bool {
        self.known_constellations.iter().any(|k| k == key)
    }

    /// True if the constellation has been seen.
    #[must_use]
    pub fn has_seen(&self, key: &str) -> bool {
        self.seen_constellations.iter().any(|k| k == key)
    }

    // =========================================================================
    // RESEARCH & TIER
    // =========================================================================

    /// Unlocked research stages, in unlock order.
    #[must_use]
    pub fn research(&self) -> &[ResearchProgression] {
        &self.research
    }

    /// True if the stage is unlocked.
    #[must_use]
    pub fn has_research(&self, stage: ResearchProgression) -> bool {
        self.research.contains(&stage)
    }

    /// Unlocks one stage. Returns false if it was already unlocked.
    pub fn unlock_research(&mut self, stage: ResearchProgression) -> bool {
        if self.has_research(stage) {
            return false;
        }
        self.research.push(stage);
        true
    }

    /// Unlocks `stage` and every stage with a lower id. Returns how many were
    /// newly unlocked.
    pub fn force_research(&mut self, stage: ResearchProgression) -> usize {
        ResearchProgression::ALL
            .into_iter()
            .filter(|s| s.id() <= stage.id())
            .filter(|s| self.unlock_research(*s))
            .count()
    }

    /// Current tier.
    #[must_use]
    pub const fn tier(&self) -> ProgressionTier {
        self.tier
    }

    /// Raises the tier. A lower tier is ignored; returns whether it changed.
    pub fn set_tier(&mut self, tier: ProgressionTier) -> bool {
        if tier <= self.tier {
            return false;
        }
        self.tier = tier;
        true
    }

    // =========================================================================
    // ATTUNEMENT
    // =========================================================================

    /// Current attunement, if any.
    #[must_use]
    pub const fn attunement(&self) -> Option<&Constellation> {
        self.attunement.as_ref()
    }

    /// True once the player has ever been attuned.
    #[must_use]
    pub const fn was_once_attuned(&self) -> bool {
        self.was_once_attuned
    }

    /// Attunes to a major constellation. Non-major constellations are
    /// rejected and leave the snapshot unchanged.
    pub fn set_attunement(&mut self, constellation: Constellation) -> bool {
        if !constellation.is_major() {
            return false;
        }
        self.attunement = Some(constellation);
        self.was_once_attuned = true;
        true
    }

    /// Drops the current attunement. The sticky flag stays set.
    pub fn clear_attunement(&mut self) -> Option<Constellation> {
        self.attunement.take()
    }

    // =========================================================================
    // PERKS
    // =========================================================================

    /// Applied perks and their data.
    #[must_use]
    pub const fn perk_usage(&self) -> &HashMap<Perk, TagCompound> {
        &self.perk_usage
    }

    /// True if the perk is applied.
    #[must_use]
    pub fn has_perk(&self, perk: &Perk) -> bool {
        self.perk_usage.contains_key(perk)
    }

    /// Data stored for an applied perk.
    #[must_use]
    pub fn perk_data(&self, perk: &Perk) -> Option<&TagCompound> {
        self.perk_usage.get(perk)
    }

    /// Applies a perk, replacing any data already stored for it.
    pub fn apply_perk(&mut self, perk: Perk, data: TagCompound) -> Option<TagCompound> {
        self.perk_usage.insert(perk, data)
    }

    /// Removes a perk and returns its data.
    pub fn remove_perk(&mut self, perk: &Perk) -> Option<TagCompound> {
        self.perk_usage.remove(perk)
    }

    /// Unredeemed free perk tokens. Duplicates are separate tokens.
    #[must_use]
    pub fn free_tokens(&self) -> &[String] {
        &self.free_tokens
    }

    /// Grants one free token.
    pub fn grant_free_token(&mut self, token: &str) {
        self.free_tokens.push(token.to_owned());
    }

    /// Redeems exactly one occurrence of `token`.
    pub fn redeem_free_token(&mut self, token: &str) -> bool {
        match self.free_tokens.iter().position(|t| t == token) {
            Some(index) => {
                self.free_tokens.remove(index);
                true
            }
            None => false,
        }
    }

    /// Accumulated perk experience.
    #[must_use]
    pub const fn perk_exp(&self) -> f64 {
        self.perk_exp
    }

    /// Adds perk experience. Negative amounts are applied as given.
    pub fn add_perk_exp(&mut self, amount: f64) {
        self.perk_exp += amount;
    }

    /// Overwrites perk experience.
    pub fn set_perk_exp(&mut self, value: f64) {
        self.perk_exp = value;
    }

    // =========================================================================
    // SEXTANT
    // =========================================================================

    /// Sextant targets used, in use order.
    #[must_use]
    pub fn used_targets(&self) -> &[TargetObject] {
        &self.used_targets
    }

    /// Records a used sextant target.
    pub fn use_target(&mut self, target: TargetObject) {
        self.used_targets.push(target);
    }

    /// True if the target has been used at least once.
    #[must_use]
    pub fn has_used_target(&self, target: &TargetObject) -> bool {
        self.used_targets.contains(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlight_shared::ConstellationKind;

    #[test]
    fn test_discover_is_unique() {
        let mut snapshot = ProgressionSnapshot::new();
        assert!(snapshot.discover_constellation("orion"));
        assert!(!snapshot.discover_constellation("orion"));
        assert!(snapshot.memorize_constellation("orion"));
        assert_eq!(snapshot.known_constellations(), ["orion".to_owned()]);
        assert!(snapshot.has_seen("orion"));
    }

    #[test]
    fn test_attunement_sticky() {
        let mut snapshot = ProgressionSnapshot::new();
        let weak = Constellation::new("mineralis", ConstellationKind::Weak);
        assert!(!snapshot.set_attunement(weak));
        assert!(!snapshot.was_once_attuned());

        let major = Constellation::new("armara", ConstellationKind::Major);
        assert!(snapshot.set_attunement(major.clone()));
        assert_eq!(snapshot.clear_attunement(), Some(major));
        assert!(snapshot.attunement().is_none());
        assert!(snapshot.was_once_attuned());
    }

    #[test]
    fn test_tier_never_lowers() {
        let mut snapshot = ProgressionSnapshot::new();
        assert!(snapshot.set_tier(ProgressionTier::ConstellationCraft));
        assert!(!snapshot.set_tier(ProgressionTier::BasicCraft));
        assert_eq!(snapshot.tier(), ProgressionTier::ConstellationCraft);
    }

    #[test]
    fn test_force_research_unlocks_prerequisites() {
        let mut snapshot = ProgressionSnapshot::new();
        snapshot.unlock_research(ResearchProgression::BasicCraft);
        assert_eq!(snapshot.force_research(ResearchProgression::Attunement), 2);
        assert!(snapshot.has_research(ResearchProgression::Discovery));
        assert!(!snapshot.has_research(ResearchProgression::Constellation));
    }

    #[test]
    fn test_redeem_removes_one_token() {
        let mut snapshot = ProgressionSnapshot::new();
        snapshot.grant_free_token("ritual");
        snapshot.grant_free_token("ritual");
        assert!(snapshot.redeem_free_token("ritual"));
        assert_eq!(snapshot.free_tokens().len(), 1);
        assert!(snapshot.redeem_free_token("ritual"));
        assert!(!snapshot.redeem_free_token("ritual"));
    }

    #[test]
    fn test_perk_exp_may_decrease() {
        let mut snapshot = ProgressionSnapshot::new();
        snapshot.add_perk_exp(20.0);
        snapshot.add_perk_exp(-4.5);
        assert!((snapshot.perk_exp() - 15.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_perks() {
        let mut snapshot = ProgressionSnapshot::new();
        let perk = Perk::new("astral:reach");
        let mut data = TagCompound::new();
        data.set_int("level", 2);
        assert!(snapshot.apply_perk(perk.clone(), data.clone()).is_none());
        assert_eq!(snapshot.perk_data(&perk), Some(&data));
        assert_eq!(snapshot.remove_perk(&perk), Some(data));
        assert!(!snapshot.has_perk(&perk));
    }
}
