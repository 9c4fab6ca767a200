//! # Knowledge Sync Message
//!
//! The only message of the progression protocol.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ state            u8     0 = ADD, 1 = WIPE                   │
//! │ known            seq<string>                                │
//! │ seen             seq<string>                                │
//! │ research         seq<i32 stage id>                          │
//! │ attunement       marker + string                            │
//! │ perk usage       seq<(string, blob)>                        │
//! │ used targets     seq<string>                                │
//! │ free tokens      seq<string>                                │
//! │ was once attuned bool                                       │
//! │ tier             i32 ordinal                                │
//! │ perk experience  f64                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A WIPE writes the same layout with every collection absent so both states
//! share one decoder path.

use std::collections::HashMap;
use std::fmt;

use starlight_shared::constants::ABSENT_MARKER;
use starlight_shared::ReferenceResolver;
use tracing::{debug, warn};

use super::serialization::{PacketDeserializer, PacketSerializer};
use crate::error::{DecodeError, DecodeResult, EncodeResult};
use crate::progress::{ProgressionSnapshot, ProgressionTier, ResearchProgression};

/// What the receiver does with the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyncState {
    /// Replace local progression with the enclosed snapshot.
    Add = 0,
    /// Discard local progression.
    Wipe = 1,
}

impl SyncState {
    /// Wire byte.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Parses the wire byte.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Add),
            1 => Some(Self::Wipe),
            _ => None,
        }
    }
}

/// A value dropped during decoding. Decoding itself continued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeDiagnostic {
    /// Research stage id with no known stage.
    UnknownResearch(i32),
    /// Attunement key that does not name a major constellation.
    UnresolvedAttunement(String),
    /// Perk key the resolver does not know.
    UnresolvedPerk(String),
    /// Sextant target key the resolver does not know.
    UnresolvedTarget(String),
    /// Tier ordinal outside the known range; the clamped tier was used.
    UnknownTier(i32),
}

impl fmt::Display for DecodeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResearch(id) => write!(f, "unknown research stage id {id}, skipped"),
            Self::UnresolvedAttunement(key) => {
                write!(f, "attunement '{key}' is not a known major constellation, left unset")
            }
            Self::UnresolvedPerk(key) => write!(f, "unknown perk '{key}', skipped"),
            Self::UnresolvedTarget(key) => write!(f, "unknown sextant target '{key}', skipped"),
            Self::UnknownTier(ordinal) => write!(f, "unknown tier ordinal {ordinal}, clamped"),
        }
    }
}

/// Progression sync message.
#[derive(Clone, Debug, PartialEq)]
pub struct KnowledgeSync {
    state: SyncState,
    snapshot: Option<ProgressionSnapshot>,
}

/// Result of a successful decode.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSync {
    /// The message.
    pub message: KnowledgeSync,
    /// Every value dropped on the way, in wire order.
    pub diagnostics: Vec<DecodeDiagnostic>,
}

impl KnowledgeSync {
    /// Full-replace message carrying `snapshot`.
    #[must_use]
    pub const fn add(snapshot: ProgressionSnapshot) -> Self {
        Self {
            state: SyncState::Add,
            snapshot: Some(snapshot),
        }
    }

    /// Message discarding the receiver's progression.
    #[must_use]
    pub const fn wipe() -> Self {
        Self {
            state: SyncState::Wipe,
            snapshot: None,
        }
    }

    /// Message state.
    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// Enclosed snapshot; `None` for WIPE.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&ProgressionSnapshot> {
        self.snapshot.as_ref()
    }

    /// Consumes the message, returning the enclosed snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> Option<ProgressionSnapshot> {
        self.snapshot
    }

    /// Encodes into a fresh buffer.
    pub fn encode(&self) -> EncodeResult<Vec<u8>> {
        let mut serializer = PacketSerializer::with_capacity(128);
        self.encode_into(&mut serializer)?;
        Ok(serializer.into_bytes())
    }

    /// Encodes into `serializer`, which is reset first.
    pub fn encode_into(&self, serializer: &mut PacketSerializer) -> EncodeResult<()> {
        serializer.reset();
        serializer.write_u8(self.state.id());
        match (self.state, &self.snapshot) {
            (SyncState::Add, Some(snapshot)) => write_snapshot(serializer, snapshot),
            _ => {
                write_empty_body(serializer);
                Ok(())
            }
        }
    }

    /// Decodes a message, resolving reference keys through `resolver`.
    ///
    /// Unresolvable keys are skipped and reported in
    /// [`DecodedSync::diagnostics`] (and logged). Structural damage is a
    /// [`DecodeError`] and nothing is returned.
    pub fn decode(bytes: &[u8], resolver: &dyn ReferenceResolver) -> DecodeResult<DecodedSync> {
        let mut deserializer = PacketDeserializer::new(bytes);
        let state_byte = deserializer.read_u8()?;
        let state = SyncState::from_id(state_byte).ok_or(DecodeError::UnknownState(state_byte))?;

        let mut diagnostics = Vec::new();
        let snapshot = read_snapshot(&mut deserializer, resolver, &mut diagnostics)?;

        if deserializer.remaining() > 0 {
            debug!(
                trailing = deserializer.remaining(),
                "ignoring trailing bytes after knowledge sync"
            );
        }

        let message = match state {
            SyncState::Add => Self::add(snapshot),
            SyncState::Wipe => {
                diagnostics.clear();
                Self::wipe()
            }
        };
        Ok(DecodedSync {
            message,
            diagnostics,
        })
    }
}

fn write_string_seq(serializer: &mut PacketSerializer, values: &[String]) -> EncodeResult<()> {
    serializer.write_sequence(values, |s, v| s.write_string(v))
}

fn write_snapshot(serializer: &mut PacketSerializer, snapshot: &ProgressionSnapshot) -> EncodeResult<()> {
    write_string_seq(serializer, &snapshot.known_constellations)?;
    write_string_seq(serializer, &snapshot.seen_constellations)?;
    serializer.write_sequence(&snapshot.research, |s, stage| {
        s.write_i32(stage.id());
        Ok(())
    })?;
    serializer.write_optional(snapshot.attunement.as_ref(), |s, c| s.write_string(c.key()))?;

    // sorted so identical snapshots encode to identical bytes
    let mut perks: Vec<_> = snapshot.perk_usage.iter().collect();
    perks.sort_by(|a, b| a.0.cmp(b.0));
    serializer.write_sequence(perks, |s, (perk, data)| {
        s.write_string(perk.key())?;
        s.write_blob(data)
    })?;

    serializer.write_sequence(&snapshot.used_targets, |s, t| s.write_string(t.key()))?;
    write_string_seq(serializer, &snapshot.free_tokens)?;
    serializer.write_bool(snapshot.was_once_attuned);
    serializer.write_i32(snapshot.tier.ordinal());
    serializer.write_f64(snapshot.perk_exp);
    Ok(())
}

fn write_empty_body(serializer: &mut PacketSerializer) {
    // known, seen, research
    for _ in 0..3 {
        serializer.write_absent_sequence();
    }
    serializer.write_i8(ABSENT_MARKER);
    // perks, targets, tokens
    for _ in 0..3 {
        serializer.write_absent_sequence();
    }
    serializer.write_bool(false);
    serializer.write_i32(0);
    serializer.write_f64(0.0);
}

fn report(diagnostics: &mut Vec<DecodeDiagnostic>, diagnostic: DecodeDiagnostic) {
    warn!("knowledge sync: {diagnostic}");
    diagnostics.push(diagnostic);
}

fn read_snapshot(
    d: &mut PacketDeserializer<'_>,
    resolver: &dyn ReferenceResolver,
    diagnostics: &mut Vec<DecodeDiagnostic>,
) -> DecodeResult<ProgressionSnapshot> {
    let known_constellations = d.read_sequence(|d| d.read_string().map(Some))?;
    let seen_constellations = d.read_sequence(|d| d.read_string().map(Some))?;

    let research = d.read_sequence(|d| {
        let id = d.read_i32()?;
        let stage = ResearchProgression::from_id(id);
        if stage.is_none() {
            report(diagnostics, DecodeDiagnostic::UnknownResearch(id));
        }
        Ok(stage)
    })?;

    let attunement = match d.read_optional(PacketDeserializer::read_string)? {
        Some(key) => {
            let resolved = resolver.constellation(&key).filter(|c| c.is_major());
            if resolved.is_none() {
                report(diagnostics, DecodeDiagnostic::UnresolvedAttunement(key));
            }
            resolved
        }
        None => None,
    };

    let perk_entries = d.read_sequence(|d| {
        let key = d.read_string()?;
        // the blob is consumed even when the key is dropped
        let data = d.read_blob()?;
        match resolver.perk(&key) {
            Some(perk) => Ok(Some((perk, data))),
            None => {
                report(diagnostics, DecodeDiagnostic::UnresolvedPerk(key));
                Ok(None)
            }
        }
    })?;
    let perk_usage: HashMap<_, _> = perk_entries.into_iter().collect();

    let used_targets = d.read_sequence(|d| {
        let key = d.read_string()?;
        let target = resolver.target(&key);
        if target.is_none() {
            report(diagnostics, DecodeDiagnostic::UnresolvedTarget(key));
        }
        Ok(target)
    })?;

    let free_tokens = d.read_sequence(|d| d.read_string().map(Some))?;
    let was_once_attuned = d.read_bool()?;

    let ordinal = d.read_i32()?;
    let tier = ProgressionTier::from_ordinal(ordinal).unwrap_or_else(|| {
        report(diagnostics, DecodeDiagnostic::UnknownTier(ordinal));
        ProgressionTier::saturating_from_ordinal(ordinal)
    });

    let perk_exp = d.read_f64()?;

    Ok(ProgressionSnapshot {
        known_constellations,
        seen_constellations,
        research,
        attunement,
        tier,
        was_once_attuned,
        perk_usage,
        free_tokens,
        perk_exp,
        used_targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlight_shared::{ConstellationKind, ReferenceRegistry, TagCompound};

    fn registry() -> ReferenceRegistry {
        let mut registry = ReferenceRegistry::new();
        registry.register_constellation("aevitas", ConstellationKind::Major);
        registry.register_constellation("lucerna", ConstellationKind::Minor);
        registry.register_perk("astral:root");
        registry.register_target("structure_ancient_shrine");
        registry
    }

    #[test]
    fn test_state_ids() {
        assert_eq!(SyncState::Add.id(), 0);
        assert_eq!(SyncState::Wipe.id(), 1);
        assert_eq!(SyncState::from_id(2), None);
    }

    #[test]
    fn test_wipe_layout() {
        let bytes = KnowledgeSync::wipe().encode().unwrap();
        // state + 3 counts + marker + 3 counts + bool + i32 + f64
        assert_eq!(bytes.len(), 1 + 12 + 1 + 12 + 1 + 4 + 8);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..5], &(-1i32).to_be_bytes());

        let decoded = KnowledgeSync::decode(&bytes, &registry()).unwrap();
        assert_eq!(decoded.message, KnowledgeSync::wipe());
        assert!(decoded.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_state_is_error() {
        let mut bytes = KnowledgeSync::wipe().encode().unwrap();
        bytes[0] = 7;
        assert_eq!(
            KnowledgeSync::decode(&bytes, &registry()),
            Err(DecodeError::UnknownState(7))
        );
    }

    #[test]
    fn test_roundtrip_full_snapshot() {
        let registry = registry();
        let mut snapshot = ProgressionSnapshot::new();
        snapshot.discover_constellation("aevitas");
        snapshot.memorize_constellation("lucerna");
        snapshot.force_research(ResearchProgression::Attunement);
        snapshot.set_attunement(registry.constellation("aevitas").unwrap());
        snapshot.set_tier(ProgressionTier::Attunement);
        let mut data = TagCompound::new();
        data.set_long("applied", 1_234);
        snapshot.apply_perk(registry.perk("astral:root").unwrap(), data);
        snapshot.use_target(registry.target("structure_ancient_shrine").unwrap());
        snapshot.grant_free_token("ritual");
        snapshot.set_perk_exp(42.25);

        let bytes = KnowledgeSync::add(snapshot.clone()).encode().unwrap();
        let decoded = KnowledgeSync::decode(&bytes, &registry).unwrap();
        assert!(decoded.diagnostics.is_empty());
        assert_eq!(decoded.message.snapshot(), Some(&snapshot));
    }

    #[test]
    fn test_minor_attunement_is_dropped() {
        let mut snapshot = ProgressionSnapshot::new();
        // bypass the mutator to put a non-major key on the wire
        snapshot.attunement = Some(starlight_shared::Constellation::new(
            "lucerna",
            ConstellationKind::Minor,
        ));
        let bytes = KnowledgeSync::add(snapshot).encode().unwrap();

        let decoded = KnowledgeSync::decode(&bytes, &registry()).unwrap();
        let snapshot = decoded.message.snapshot().unwrap();
        assert!(snapshot.attunement().is_none());
        assert_eq!(
            decoded.diagnostics,
            vec![DecodeDiagnostic::UnresolvedAttunement("lucerna".to_owned())]
        );
    }

    #[test]
    fn test_unknown_research_and_tier() {
        let mut s = PacketSerializer::new();
        s.write_u8(SyncState::Add.id());
        s.write_absent_sequence();
        s.write_absent_sequence();
        s.write_sequence([0, 9, 5], |s, id| {
            s.write_i32(id);
            Ok(())
        })
        .unwrap();
        s.write_i8(-1);
        for _ in 0..3 {
            s.write_absent_sequence();
        }
        s.write_bool(true);
        s.write_i32(40);
        s.write_f64(1.0);

        let decoded = KnowledgeSync::decode(s.as_slice(), &registry()).unwrap();
        let snapshot = decoded.message.snapshot().unwrap();
        assert_eq!(
            snapshot.research(),
            &[ResearchProgression::Discovery, ResearchProgression::Brilliance]
        );
        assert_eq!(snapshot.tier(), ProgressionTier::HIGHEST);
        assert_eq!(
            decoded.diagnostics,
            vec![
                DecodeDiagnostic::UnknownResearch(9),
                DecodeDiagnostic::UnknownTier(40)
            ]
        );
    }

    #[test]
    fn test_truncated_message_is_error() {
        let bytes = KnowledgeSync::add(ProgressionSnapshot::new()).encode().unwrap();
        let result = KnowledgeSync::decode(&bytes[..bytes.len() - 1], &registry());
        assert!(matches!(result, Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_identical_snapshots_encode_identically() {
        let mut a = ProgressionSnapshot::new();
        let mut b = ProgressionSnapshot::new();
        for key in ["astral:root", "astral:reach", "astral:magnet"] {
            a.apply_perk(starlight_shared::Perk::new(key), TagCompound::new());
        }
        for key in ["astral:magnet", "astral:root", "astral:reach"] {
            b.apply_perk(starlight_shared::Perk::new(key), TagCompound::new());
        }
        assert_eq!(
            KnowledgeSync::add(a).encode().unwrap(),
            KnowledgeSync::add(b).encode().unwrap()
        );
    }
}
