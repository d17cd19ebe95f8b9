use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use algpool_core::infrastructure_in_memory::{ConfiguredFactory, UnitSpec};
use algpool_core::types::Composition;
use algpool_core::{AlgResourcePool, PoolConfig, UnitFactory};

use std::sync::Arc;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn make_pool(config: PoolConfig, specs: Vec<UnitSpec>) -> AlgResourcePool {
    let factory: Arc<dyn UnitFactory> = Arc::new(ConfiguredFactory::new(specs));
    let mut pool = AlgResourcePool::new(config, factory);
    pool.initialize().expect("bench pool must initialize");
    pool
}

/// A sequence of `width` leaves, each nested `depth` levels deep
fn nested_specs(width: usize, depth: usize) -> Vec<UnitSpec> {
    let mut specs = Vec::new();
    let mut top = Vec::new();
    for w in 0..width {
        let leaf = format!("Alg{}", w);
        let mut inner = leaf.clone();
        for d in 0..depth {
            let seq = format!("Seq{}_{}", w, d);
            specs.push(UnitSpec::composite(&seq, &[&inner], Composition::default()));
            inner = seq;
        }
        top.push(inner);
        specs.push(UnitSpec::leaf(leaf).with_cardinality(4));
    }
    let members: Vec<&str> = top.iter().map(|s| s.as_str()).collect();
    specs.push(UnitSpec::composite("Top", &members, Composition::default()));
    specs
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_acquire_release(c: &mut Criterion) {
    let pool = make_pool(
        PoolConfig::with_top_units(&["Alg"]),
        vec![UnitSpec::leaf("Alg").with_cardinality(4).with_resources(&["Det"])],
    );

    c.bench_function("acquire_release_cycle", |b| {
        b.iter(|| {
            if let Some(instance) = pool.acquire_algorithm(black_box("Alg"), false).unwrap().instance() {
                pool.release_algorithm("Alg", instance).unwrap();
            }
        })
    });
}

fn bench_reentrant_acquire(c: &mut Criterion) {
    let pool = make_pool(
        PoolConfig::with_top_units(&["Shared"]),
        vec![UnitSpec::leaf("Shared").with_cardinality(0)],
    );

    c.bench_function("reentrant_acquire", |b| {
        b.iter(|| black_box(pool.acquire_algorithm("Shared", false).unwrap().is_success()))
    });
}

fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("initialize");

    for width in [10, 100, 500] {
        let specs = nested_specs(width, 3);
        group.bench_with_input(BenchmarkId::new("leaves", width), &specs, |b, specs| {
            b.iter(|| make_pool(PoolConfig::with_top_units(&["Top"]), specs.clone()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_acquire_release, bench_reentrant_acquire, bench_initialize);
criterion_main!(benches);
