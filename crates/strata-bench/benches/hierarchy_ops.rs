//! Criterion micro-benchmarks for reparenting, cascades, and traversals.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_arena::CapacityConfig;
use strata_bench::{deep_forest, drain, populated_engine};
use strata_core::InstanceId;
use strata_hierarchy::DepthMap;

/// Benchmark: move a 10-level, 1K-node forest under a new root and back.
fn bench_reparent_cascade(c: &mut Criterion) {
    let (mut engine, ids) = populated_engine(1_001).unwrap();
    let (anchor, rest) = ids.split_last().unwrap();
    let roots = deep_forest(&mut engine, rest, 100, 10).unwrap();
    drain(&mut engine).unwrap();
    c.bench_function("reparent_cascade_1k", |b| {
        b.iter(|| {
            for root in &roots {
                engine.set_parent(*root, *anchor).unwrap();
            }
            for root in &roots {
                engine.set_parent(*root, InstanceId::NULL).unwrap();
            }
            black_box(drain(&mut engine).unwrap());
        });
    });
}

/// Benchmark: attach and detach 256 children of a single parent, crossing
/// the child-list promotion threshold both ways.
fn bench_wide_fanout(c: &mut Criterion) {
    let mut map = DepthMap::new(64, CapacityConfig::new(1024, 64));
    let parent = InstanceId(1);
    map.register(parent).unwrap();
    let children: Vec<InstanceId> = (2..258).map(InstanceId).collect();
    for child in &children {
        map.register(*child).unwrap();
    }
    c.bench_function("wide_fanout_256", |b| {
        b.iter(|| {
            for child in &children {
                map.set_parent(*child, parent).unwrap();
            }
            for child in &children {
                map.set_parent(*child, InstanceId::NULL).unwrap();
            }
            while !map.flush(usize::MAX).unwrap().is_final() {}
            black_box(map.len());
        });
    });
}

/// Benchmark: full descendant walk of a 10-level forest.
fn bench_descendants(c: &mut Criterion) {
    let (mut engine, ids) = populated_engine(1_001).unwrap();
    let (anchor, rest) = ids.split_last().unwrap();
    let roots = deep_forest(&mut engine, rest, 100, 10).unwrap();
    for root in &roots {
        engine.set_parent(*root, *anchor).unwrap();
    }
    c.bench_function("descendants_1k", |b| {
        b.iter(|| black_box(engine.descendants_of(*anchor).unwrap().len()));
    });
}

criterion_group!(
    benches,
    bench_reparent_cascade,
    bench_wide_fanout,
    bench_descendants
);
criterion_main!(benches);
