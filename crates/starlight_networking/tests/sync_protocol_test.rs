//! Integration tests for progression sync: server store, wire codec,
//! transport and the client apply queue together.

use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starlight_networking::{
    sync_pipeline, ChannelTransport, DecodeDiagnostic, KnowledgeSync, PlayerId, ProgressServer,
    ProgressionSnapshot, ProgressionTier, ReceiveOutcome, ResearchProgression, SyncConfig,
};
use starlight_shared::{ConstellationKind, Perk, ReferenceRegistry, ReferenceResolver, TagCompound};

fn registry() -> ReferenceRegistry {
    let mut registry = ReferenceRegistry::new();
    for key in ["aevitas", "armara", "discidia", "evorsio", "vicio"] {
        registry.register_constellation(key, ConstellationKind::Major);
    }
    for key in ["mineralis", "pelotrio", "octans"] {
        registry.register_constellation(key, ConstellationKind::Weak);
    }
    for key in ["gelu", "ulteria", "alcara"] {
        registry.register_constellation(key, ConstellationKind::Minor);
    }
    for key in ["astral:root", "astral:reach", "astral:magnet", "astral:mining"] {
        registry.register_perk(key);
    }
    for key in ["shrine_desert", "shrine_small", "smoke_ring"] {
        registry.register_target(key);
    }
    registry
}

fn random_snapshot(rng: &mut StdRng, registry: &ReferenceRegistry) -> ProgressionSnapshot {
    const CONSTELLATIONS: [&str; 6] = ["aevitas", "armara", "gelu", "mineralis", "orion", "lyra"];
    const PERKS: [&str; 4] = ["astral:root", "astral:reach", "astral:magnet", "astral:mining"];
    const TARGETS: [&str; 3] = ["shrine_desert", "shrine_small", "smoke_ring"];

    let mut snapshot = ProgressionSnapshot::new();
    for key in CONSTELLATIONS {
        if rng.gen_bool(0.5) {
            snapshot.discover_constellation(key);
        }
        if rng.gen_bool(0.3) {
            snapshot.memorize_constellation(key);
        }
    }
    for stage in ResearchProgression::ALL {
        if rng.gen_bool(0.5) {
            snapshot.unlock_research(stage);
        }
    }
    if rng.gen_bool(0.5) {
        let key = ["aevitas", "armara", "vicio"][rng.gen_range(0..3)];
        snapshot.set_attunement(registry.constellation(key).unwrap());
    }
    snapshot.set_tier(ProgressionTier::ALL[rng.gen_range(0..ProgressionTier::ALL.len())]);
    for key in PERKS {
        if rng.gen_bool(0.5) {
            let mut data = TagCompound::new();
            data.set_int("level", rng.gen_range(0..10));
            data.set_double("charge", rng.gen());
            snapshot.apply_perk(Perk::new(key), data);
        }
    }
    for _ in 0..rng.gen_range(0..4) {
        snapshot.grant_free_token("ritual");
    }
    for _ in 0..rng.gen_range(0..3) {
        let key = TARGETS[rng.gen_range(0..TARGETS.len())];
        snapshot.use_target(registry.target(key).unwrap());
    }
    snapshot.set_perk_exp(rng.gen_range(0.0..10_000.0));
    snapshot
}

#[test]
fn test_random_snapshots_roundtrip() {
    let registry = registry();
    let mut rng = StdRng::seed_from_u64(0x5747_4152);

    for _ in 0..200 {
        let snapshot = random_snapshot(&mut rng, &registry);
        let bytes = KnowledgeSync::add(snapshot.clone()).encode().unwrap();
        let decoded = KnowledgeSync::decode(&bytes, &registry).unwrap();
        assert!(decoded.diagnostics.is_empty());
        assert_eq!(decoded.message.snapshot(), Some(&snapshot));
    }
}

#[test]
fn test_empty_snapshot_roundtrip() {
    let registry = registry();
    let bytes = KnowledgeSync::add(ProgressionSnapshot::new()).encode().unwrap();
    let decoded = KnowledgeSync::decode(&bytes, &registry).unwrap();
    assert_eq!(decoded.message.snapshot(), Some(&ProgressionSnapshot::new()));
}

#[test]
fn test_orion_scenario() {
    let registry = registry();
    let mut snapshot = ProgressionSnapshot::new();
    snapshot.discover_constellation("orion");
    snapshot.set_tier(ProgressionTier::Attunement);
    snapshot.set_perk_exp(15.5);

    let bytes = KnowledgeSync::add(snapshot).encode().unwrap();
    let decoded = KnowledgeSync::decode(&bytes, &registry).unwrap();
    let snapshot = decoded.message.snapshot().unwrap();

    assert_eq!(snapshot.known_constellations(), ["orion".to_owned()]);
    assert!(snapshot.attunement().is_none());
    assert_eq!(snapshot.tier().ordinal(), 2);
    assert!((snapshot.perk_exp() - 15.5).abs() < f64::EPSILON);

    assert!(snapshot.seen_constellations().is_empty());
    assert!(snapshot.research().is_empty());
    assert!(snapshot.perk_usage().is_empty());
    assert!(snapshot.free_tokens().is_empty());
    assert!(snapshot.used_targets().is_empty());
    assert!(!snapshot.was_once_attuned());
}

#[test]
fn test_unknown_perk_dropped_with_one_diagnostic() {
    let server_registry = {
        let mut r = registry();
        r.register_perk("astral:retired");
        r
    };
    let client_registry = registry();

    let mut snapshot = ProgressionSnapshot::new();
    for key in ["astral:root", "astral:retired", "astral:reach"] {
        let mut data = TagCompound::new();
        data.set_string("source", key);
        snapshot.apply_perk(server_registry.perk(key).unwrap(), data);
    }
    snapshot.grant_free_token("after_perks");

    let bytes = KnowledgeSync::add(snapshot.clone()).encode().unwrap();
    let decoded = KnowledgeSync::decode(&bytes, &client_registry).unwrap();
    let received = decoded.message.snapshot().unwrap();

    assert_eq!(
        decoded.diagnostics,
        vec![DecodeDiagnostic::UnresolvedPerk("astral:retired".to_owned())]
    );
    assert_eq!(received.perk_usage().len(), 2);
    for key in ["astral:root", "astral:reach"] {
        let perk = Perk::new(key);
        assert_eq!(received.perk_data(&perk), snapshot.perk_data(&perk));
    }
    // fields after the dropped entry still decode
    assert_eq!(received.free_tokens(), ["after_perks".to_owned()]);
}

#[test]
fn test_unknown_target_and_attunement_dropped() {
    let mut server_registry = registry();
    server_registry.register_target("shrine_removed");
    server_registry.register_constellation("bootes", ConstellationKind::Major);

    let mut snapshot = ProgressionSnapshot::new();
    snapshot.use_target(server_registry.target("shrine_small").unwrap());
    snapshot.use_target(server_registry.target("shrine_removed").unwrap());
    snapshot.set_attunement(server_registry.constellation("bootes").unwrap());

    let bytes = KnowledgeSync::add(snapshot).encode().unwrap();
    let decoded = KnowledgeSync::decode(&bytes, &registry()).unwrap();
    let received = decoded.message.snapshot().unwrap();

    assert!(received.attunement().is_none());
    assert!(received.was_once_attuned());
    assert_eq!(received.used_targets().len(), 1);
    assert_eq!(decoded.diagnostics.len(), 2);
}

#[test]
fn test_wipe_is_idempotent() {
    let registry = Arc::new(registry());
    let (receiver, mut client) = sync_pipeline(&SyncConfig::default(), registry.clone());

    let mut rng = StdRng::seed_from_u64(7);
    let snapshot = random_snapshot(&mut rng, &registry);
    receiver.receive(&KnowledgeSync::add(snapshot).encode().unwrap());
    let wipe = KnowledgeSync::wipe().encode().unwrap();
    receiver.receive(&wipe);
    receiver.receive(&wipe);

    assert_eq!(client.process_pending(), 3);
    assert_eq!(client.snapshot(), &ProgressionSnapshot::new());
}

#[test]
fn test_messages_apply_in_arrival_order() {
    let registry = Arc::new(registry());
    let (receiver, mut client) = sync_pipeline(&SyncConfig::default(), registry);

    for exp in 1..=5 {
        let mut snapshot = ProgressionSnapshot::new();
        snapshot.set_perk_exp(f64::from(exp));
        receiver.receive(&KnowledgeSync::add(snapshot).encode().unwrap());
    }
    assert_eq!(client.process_pending(), 5);
    assert!((client.snapshot().perk_exp() - 5.0).abs() < f64::EPSILON);
}

#[test]
fn test_server_to_client_over_transport_thread() {
    let registry = Arc::new(registry());
    let player = PlayerId(42);

    let transport = ChannelTransport::new();
    let link = transport.connect(player, 64);
    let mut server = ProgressServer::new(transport);
    let (receiver, mut client) = sync_pipeline(&SyncConfig::default(), registry.clone());

    for step in 0..10 {
        let progress = server.progress_mut(player);
        progress.discover_constellation(&format!("star_{step}"));
        progress.add_perk_exp(1.0);
        server.sync(player).unwrap();
    }
    assert!(server.transport().disconnect(player));

    // receive context: decodes only
    let handle = thread::spawn(move || {
        let mut outcomes = Vec::new();
        for bytes in link.iter() {
            outcomes.push(receiver.receive(&bytes));
        }
        outcomes
    });
    let outcomes = handle.join().unwrap();
    assert_eq!(outcomes.len(), 10);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, ReceiveOutcome::Queued { diagnostics: 0 })));

    // simulation step applies everything at once, last message wins
    assert_eq!(client.process_pending(), 10);
    assert_eq!(client.snapshot(), server.progress(player).unwrap());
    assert_eq!(client.snapshot().known_constellations().len(), 10);
    assert_eq!(client.stats().applied, 10);
}

#[test]
fn test_truncated_message_never_applies() {
    let registry = Arc::new(registry());
    let (receiver, mut client) = sync_pipeline(&SyncConfig::default(), registry);

    let mut snapshot = ProgressionSnapshot::new();
    snapshot.discover_constellation("orion");
    let bytes = KnowledgeSync::add(snapshot).encode().unwrap();

    for cut in 0..bytes.len() {
        assert_eq!(receiver.receive(&bytes[..cut]), ReceiveOutcome::Malformed);
    }
    assert_eq!(client.process_pending(), 0);
    assert_eq!(client.snapshot(), &ProgressionSnapshot::new());
    assert_eq!(client.stats().dropped_malformed, bytes.len() as u64);
}
