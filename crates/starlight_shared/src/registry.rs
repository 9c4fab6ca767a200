//! # Domain References
//!
//! Constellations, perks and sextant targets travel over the wire and into
//! storage as plain string keys. Both sides turn a key back into a domain
//! object through an injected [`ReferenceResolver`]; the codec never sees a
//! concrete registry.
//!
//! ```text
//!   encode:  Constellation ──key()──> "aevitas"
//!   decode:  "aevitas" ──resolver.resolve(Constellation, ..)──> Some(Constellation)
//!                                                        or ──> None (dropped + diagnostic)
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a constellation.
///
/// Major constellations are also weak ones; minor constellations are traits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstellationKind {
    /// Attunable constellation.
    Major,
    /// Constellation a collector can be bound to.
    Weak,
    /// Trait constellation.
    Minor,
}

/// A constellation known to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constellation {
    key: String,
    kind: ConstellationKind,
}

impl Constellation {
    /// Creates a constellation reference.
    #[must_use]
    pub fn new(key: impl Into<String>, kind: ConstellationKind) -> Self {
        Self { key: key.into(), kind }
    }

    /// Registry key used on the wire and in storage.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Category of this constellation.
    #[must_use]
    pub const fn kind(&self) -> ConstellationKind {
        self.kind
    }

    /// True for attunable constellations.
    #[must_use]
    pub const fn is_major(&self) -> bool {
        matches!(self.kind, ConstellationKind::Major)
    }

    /// True for constellations a collector may carry (major or weak).
    #[must_use]
    pub const fn is_weak(&self) -> bool {
        matches!(self.kind, ConstellationKind::Major | ConstellationKind::Weak)
    }

    /// True for trait constellations.
    #[must_use]
    pub const fn is_minor(&self) -> bool {
        matches!(self.kind, ConstellationKind::Minor)
    }
}

impl fmt::Display for Constellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// A perk in the perk tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Perk {
    key: String,
}

impl Perk {
    /// Creates a perk reference.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Registry key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A sextant target (domain-specific waypoint kind).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetObject {
    key: String,
}

impl TargetObject {
    /// Creates a target reference.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Registry key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Which registry a key is looked up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Constellation registry.
    Constellation,
    /// Perk tree.
    Perk,
    /// Sextant targets.
    Target,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constellation => "constellation",
            Self::Perk => "perk",
            Self::Target => "target",
        };
        f.write_str(name)
    }
}

/// A resolved reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    /// Resolved constellation.
    Constellation(Constellation),
    /// Resolved perk.
    Perk(Perk),
    /// Resolved sextant target.
    Target(TargetObject),
}

/// Lookup capability the codec and persistence depend on.
pub trait ReferenceResolver: Send + Sync {
    /// Resolves a key in the registry selected by `kind`.
    fn resolve(&self, kind: ReferenceKind, key: &str) -> Option<Reference>;

    /// Resolves a constellation key.
    fn constellation(&self, key: &str) -> Option<Constellation> {
        match self.resolve(ReferenceKind::Constellation, key) {
            Some(Reference::Constellation(c)) => Some(c),
            _ => None,
        }
    }

    /// Resolves a perk key.
    fn perk(&self, key: &str) -> Option<Perk> {
        match self.resolve(ReferenceKind::Perk, key) {
            Some(Reference::Perk(p)) => Some(p),
            _ => None,
        }
    }

    /// Resolves a sextant target key.
    fn target(&self, key: &str) -> Option<TargetObject> {
        match self.resolve(ReferenceKind::Target, key) {
            Some(Reference::Target(t)) => Some(t),
            _ => None,
        }
    }
}

/// Registry contents as written in configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryDefinition {
    /// Attunable constellation keys.
    pub major: Vec<String>,
    /// Weak constellation keys.
    pub weak: Vec<String>,
    /// Trait constellation keys.
    pub minor: Vec<String>,
    /// Perk keys.
    pub perks: Vec<String>,
    /// Sextant target keys.
    pub targets: Vec<String>,
}

/// Map-backed [`ReferenceResolver`].
#[derive(Clone, Debug, Default)]
pub struct ReferenceRegistry {
    constellations: HashMap<String, Constellation>,
    perks: HashMap<String, Perk>,
    targets: HashMap<String, TargetObject>,
}

impl ReferenceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from its configuration form.
    #[must_use]
    pub fn from_definition(definition: &RegistryDefinition) -> Self {
        let mut registry = Self::new();
        let groups = [
            (&definition.major, ConstellationKind::Major),
            (&definition.weak, ConstellationKind::Weak),
            (&definition.minor, ConstellationKind::Minor),
        ];
        for (keys, kind) in groups {
            for key in keys {
                registry.register_constellation(key.as_str(), kind);
            }
        }
        for key in &definition.perks {
            registry.register_perk(key.as_str());
        }
        for key in &definition.targets {
            registry.register_target(key.as_str());
        }
        registry
    }

    /// Registers a constellation and returns its reference.
    pub fn register_constellation(&mut self, key: &str, kind: ConstellationKind) -> Constellation {
        let constellation = Constellation::new(key, kind);
        self.constellations.insert(key.to_owned(), constellation.clone());
        constellation
    }

    /// Registers a perk and returns its reference.
    pub fn register_perk(&mut self, key: &str) -> Perk {
        let perk = Perk::new(key);
        self.perks.insert(key.to_owned(), perk.clone());
        perk
    }

    /// Registers a sextant target and returns its reference.
    pub fn register_target(&mut self, key: &str) -> TargetObject {
        let target = TargetObject::new(key);
        self.targets.insert(key.to_owned(), target.clone());
        target
    }

    /// Total number of registered references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constellations.len() + self.perks.len() + self.targets.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReferenceResolver for ReferenceRegistry {
    fn resolve(&self, kind: ReferenceKind, key: &str) -> Option<Reference> {
        match kind {
            ReferenceKind::Constellation => {
                self.constellations.get(key).cloned().map(Reference::Constellation)
            }
            ReferenceKind::Perk => self.perks.get(key).cloned().map(Reference::Perk),
            ReferenceKind::Target => self.targets.get(key).cloned().map(Reference::Target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_kind() {
        let mut registry = ReferenceRegistry::new();
        registry.register_constellation("discidia", ConstellationKind::Major);
        registry.register_perk("astral:magnet");
        registry.register_target("structure_desert");

        assert!(registry.constellation("discidia").unwrap().is_major());
        assert!(registry.perk("astral:magnet").is_some());
        assert!(registry.target("structure_desert").is_some());

        // keys do not leak across registries
        assert!(registry.perk("discidia").is_none());
        assert!(registry.constellation("structure_desert").is_none());
    }

    #[test]
    fn test_major_is_also_weak() {
        let major = Constellation::new("aevitas", ConstellationKind::Major);
        let minor = Constellation::new("gelu", ConstellationKind::Minor);
        assert!(major.is_weak());
        assert!(!minor.is_weak());
        assert!(minor.is_minor());
    }

    #[test]
    fn test_from_toml_definition() {
        let text = r#"
            major = ["aevitas", "discidia"]
            minor = ["gelu"]
            perks = ["astral:root"]
        "#;
        let definition: RegistryDefinition = toml::from_str(text).unwrap();
        let registry = ReferenceRegistry::from_definition(&definition);
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.constellation("gelu").map(|c| c.kind()),
            Some(ConstellationKind::Minor)
        );
        assert!(registry.target("anything").is_none());
    }
}
