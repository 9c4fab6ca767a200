//! # Structure Match Benchmark
//!
//! Per-step cost of checking collector platforms. Most steps change no
//! block near a collector, so the unchanged-chunk path dominates.
//!
//! Run with: `cargo bench --package starlight_world`

// Benchmarks don't need docs
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starlight_shared::{BlockPos, Constellation, ConstellationKind, WorldId};
use starlight_world::{
    Block, BlockGrid, CollectorType, CrystalProperties, NetworkRegistries, PatternBlockArray,
    StarlightWorld, StructureMatcher, WorldConfig,
};

fn benchmark_matcher(c: &mut Criterion) {
    let pattern = Arc::new(PatternBlockArray::collector_enhancement());
    let anchor = BlockPos::new(7, 64, 7);
    let mut grid = BlockGrid::new();
    pattern.build(&mut grid, anchor).unwrap();

    let mut group = c.benchmark_group("matcher");
    group.bench_function("unchanged_chunks", |b| {
        let mut matcher = StructureMatcher::new(anchor, Arc::clone(&pattern)).unwrap();
        b.iter(|| black_box(matcher.matches(&grid)));
    });
    group.bench_function("full_check", |b| {
        b.iter(|| black_box(pattern.matches(&grid, anchor)));
    });
    group.finish();
}

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for collectors in [16, 256] {
        let mut rng = StdRng::seed_from_u64(7);
        let mut networks = NetworkRegistries::new();
        let mut world = StarlightWorld::new(WorldId(0), WorldConfig::default());
        let pattern = PatternBlockArray::collector_enhancement();

        for i in 0..collectors {
            let pos = BlockPos::new(i * 4, 64, rng.gen_range(-512..512));
            if rng.gen_bool(0.5) {
                pattern.build(world.grid_mut(), pos).unwrap();
            }
            world
                .place_collector(
                    networks.get_or_create(WorldId(0)),
                    pos,
                    Constellation::new("armara", ConstellationKind::Major),
                    None,
                    CrystalProperties::max_celestial(),
                    true,
                    CollectorType::CelestialCrystal,
                )
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::new("idle", collectors), &collectors, |b, _| {
            b.iter(|| black_box(world.step(networks.get_or_create(WorldId(0)))));
        });

        group.bench_with_input(BenchmarkId::new("one_edit", collectors), &collectors, |b, _| {
            let mut toggle = false;
            b.iter(|| {
                toggle = !toggle;
                let block = if toggle { Block::STONE } else { Block::STARMETAL };
                world.grid_mut().set_block(BlockPos::new(0, 62, 0), block).unwrap();
                black_box(world.step(networks.get_or_create(WorldId(0))))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_matcher, benchmark_world_step);
criterion_main!(benches);
