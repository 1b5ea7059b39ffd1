//! Benchmarks for trie lookups, artifact loading, and the batch pipeline.
//!
//! Run with: cargo bench
//!
//! This benchmark suite measures:
//! - Single-address lookup throughput (parsed and pre-parsed)
//! - Build and decode time for realistic range counts
//! - Pipeline throughput across worker counts

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ip2cloud::{format_ipv4, LookupPipeline, PipelineConfig, Trie};
use std::collections::BTreeMap;

/// Xorshift sequence so every run sees the same data.
fn xorshift(seed: u32) -> impl Iterator<Item = u32> {
    let mut x = seed.max(1);
    std::iter::repeat_with(move || {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        x
    })
}

/// Generate `providers` owners with `ranges_per_provider` CIDRs of mixed length.
fn generate_data(providers: usize, ranges_per_provider: usize) -> BTreeMap<String, Vec<String>> {
    let mut rng = xorshift(0x9E37_79B9);
    let mut data = BTreeMap::new();
    for p in 0..providers {
        let cidrs = (0..ranges_per_provider)
            .map(|i| {
                let prefix = [12u32, 16, 20, 22, 24, 28, 32][i % 7];
                let network = rng.next().unwrap_or(0) & (u32::MAX << (32 - prefix));
                format!("{}/{}", format_ipv4(network), prefix)
            })
            .collect();
        data.insert(format!("provider{}", p), cidrs);
    }
    data
}

fn generate_queries(count: usize) -> Vec<String> {
    xorshift(0xC0FF_EE11).take(count).map(format_ipv4).collect()
}

/// Benchmark single lookups including address parsing.
fn bench_lookup(c: &mut Criterion) {
    let trie = Trie::build(&generate_data(20, 5_000));
    let queries = generate_queries(10_000);
    let raw: Vec<u32> = xorshift(0xC0FF_EE11).take(10_000).collect();

    let mut group = c.benchmark_group("lookup");
    group.throughput(Throughput::Elements(queries.len() as u64));

    group.bench_function("parse_and_lookup", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(trie.lookup(query));
            }
        })
    });

    group.bench_function("lookup_u32", |b| {
        b.iter(|| {
            for ip in &raw {
                black_box(trie.lookup_u32(*ip));
            }
        })
    });

    group.finish();
}

/// Benchmark build and decode at several sizes.
fn bench_build_and_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("artifact");
    group.sample_size(20);

    for ranges in [1_000, 10_000, 50_000].iter() {
        let data = generate_data(10, ranges / 10);
        let bytes = Trie::build(&data).encode();

        group.bench_with_input(BenchmarkId::new("build", ranges), ranges, |b, _| {
            b.iter(|| black_box(Trie::build(&data)))
        });
        group.bench_with_input(BenchmarkId::new("decode", ranges), ranges, |b, _| {
            b.iter(|| black_box(Trie::decode(&bytes).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark the batch pipeline across worker counts.
fn bench_pipeline(c: &mut Criterion) {
    let trie = Trie::build(&generate_data(20, 5_000));
    let queries = generate_queries(100_000);

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(queries.len() as u64));
    group.sample_size(20);

    for workers in [1, 4, 16].iter() {
        let config = PipelineConfig::with_workers(*workers);
        let pipeline = LookupPipeline::with_config(&trie, config);
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, _| {
            b.iter(|| {
                let batches: Vec<Vec<String>> =
                    queries.chunks(4096).map(|c| c.to_vec()).collect();
                let mut matched = 0usize;
                pipeline.run(batches, |batch| matched += batch.len());
                black_box(matched)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lookup, bench_build_and_decode, bench_pipeline);
criterion_main!(benches);
