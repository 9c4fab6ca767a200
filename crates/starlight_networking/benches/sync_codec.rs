//! # Knowledge Sync Codec Benchmark
//!
//! Encode and decode cost of a full progression snapshot. Every sync sends
//! the complete snapshot, so this is the per-message cost on both sides.
//!
//! Run with: `cargo bench --package starlight_networking`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use starlight_networking::{
    KnowledgeSync, PacketSerializer, ProgressionSnapshot, ProgressionTier, ResearchProgression,
};
use starlight_shared::{ConstellationKind, ReferenceRegistry, ReferenceResolver, TagCompound};

fn build(perks: usize) -> (ReferenceRegistry, ProgressionSnapshot) {
    let mut registry = ReferenceRegistry::new();
    registry.register_constellation("aevitas", ConstellationKind::Major);
    let mut snapshot = ProgressionSnapshot::new();

    for i in 0..32 {
        snapshot.discover_constellation(&format!("constellation_{i}"));
    }
    snapshot.force_research(ResearchProgression::Brilliance);
    if let Some(c) = registry.constellation("aevitas") {
        snapshot.set_attunement(c);
    }
    snapshot.set_tier(ProgressionTier::TraitCraft);

    for i in 0..perks {
        let perk = registry.register_perk(&format!("astral:perk_{i}"));
        let mut data = TagCompound::new();
        data.set_int("level", i32::try_from(i).unwrap_or(i32::MAX));
        data.set_long("unlocked_at", 1_700_000_000);
        snapshot.apply_perk(perk, data);
    }
    snapshot.set_perk_exp(12_345.5);
    (registry, snapshot)
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("knowledge_sync_encode");

    for perks in [0, 16, 128] {
        let (_, snapshot) = build(perks);
        let message = KnowledgeSync::add(snapshot);
        let mut serializer = PacketSerializer::with_capacity(4096);
        group.bench_with_input(BenchmarkId::from_parameter(perks), &perks, |b, _| {
            b.iter(|| {
                message.encode_into(&mut serializer).unwrap_or_default();
                black_box(serializer.len())
            });
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("knowledge_sync_decode");

    for perks in [0, 16, 128] {
        let (registry, snapshot) = build(perks);
        let bytes = KnowledgeSync::add(snapshot).encode().unwrap_or_default();
        group.bench_with_input(BenchmarkId::from_parameter(perks), &bytes, |b, bytes| {
            b.iter(|| black_box(KnowledgeSync::decode(bytes, &registry).is_ok()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
