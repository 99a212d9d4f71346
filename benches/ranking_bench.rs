use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use matcher::{cosine_similarity, rank_with_threshold};
use semsearch::Document;

const DIM: usize = 384;

/// Deterministic pseudo-random unit-ish vectors.
fn vector(seed: usize) -> Vec<f32> {
    (0..DIM)
        .map(|i| (((seed * 31 + i * 17) % 97) as f32 / 97.0) - 0.5)
        .collect()
}

fn corpus(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| Document::new(format!("doc-{i}"), "title", "content", vector(i)))
        .collect()
}

fn bench_cosine(c: &mut Criterion) {
    let a = vector(1);
    let b = vector(2);
    c.bench_function("cosine_similarity_384", |bench| {
        bench.iter(|| cosine_similarity(black_box(&a), black_box(&b)))
    });
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_top5");
    let query = vector(12_345);

    for size in [100usize, 1_000, 10_000] {
        let docs = corpus(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("sequential", size), &docs, |bench, docs| {
            bench.iter(|| rank_with_threshold(black_box(&query), docs, 5, usize::MAX))
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), &docs, |bench, docs| {
            bench.iter(|| rank_with_threshold(black_box(&query), docs, 5, 1))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cosine, bench_rank);
criterion_main!(benches);
