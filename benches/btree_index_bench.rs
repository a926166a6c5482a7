//! Insert, lookup and delete throughput across branching factors.

use btree_index::BTreeIndex;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const KEYS: u64 = 10_000;

/// Deterministic scatter of 0..KEYS (multiplier is coprime with KEYS).
fn scattered() -> impl Iterator<Item = u64> {
    (0..KEYS).map(|i| (i * 7_919) % KEYS)
}

fn filled(order: usize) -> BTreeIndex<u64> {
    let mut index = BTreeIndex::with_order(order).unwrap();
    index.insert_all(scattered()).unwrap();
    index
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for order in [4, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(order), &order, |b, &order| {
            b.iter(|| black_box(filled(order)))
        });
    }
    group.finish();
}

fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains");
    for order in [4, 16, 64] {
        let index = filled(order);
        group.bench_with_input(BenchmarkId::from_parameter(order), &index, |b, index| {
            b.iter(|| scattered().filter(|k| index.contains(black_box(k))).count())
        });
    }
    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_all");
    for order in [4, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(order), &order, |b, &order| {
            b.iter_batched(
                || filled(order),
                |mut index| {
                    for key in scattered() {
                        index.delete(&key).unwrap();
                    }
                    index
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_contains, bench_delete);
criterion_main!(benches);
