//! Performance benchmarks for ferroflate-deflate.
//!
//! Measures compression throughput across levels and data patterns, plus
//! decompression speed on the compressor's own output.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ferroflate_deflate::{deflate, inflate};
use std::hint::black_box;

/// Generate test data patterns for benchmarking.
mod test_data {
    /// Uniform data: every byte the same.
    pub fn uniform(size: usize) -> Vec<u8> {
        vec![0xAA; size]
    }

    /// Pseudorandom data: close to incompressible.
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }

    /// Text-like data with plenty of medium-distance repeats.
    pub fn text_like(size: usize) -> Vec<u8> {
        let text = b"The quick brown fox jumps over the lazy dog. \
                     Pack my box with five dozen liquor jugs. \
                     How vexingly quick daft zebras jump! ";
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            let remaining = size - data.len();
            data.extend_from_slice(&text[..remaining.min(text.len())]);
        }
        data
    }
}

fn bench_compress_levels(c: &mut Criterion) {
    let data = test_data::text_like(256 * 1024);
    let mut group = c.benchmark_group("compress_levels");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for level in [1u8, 6, 9] {
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, &level| {
            b.iter(|| deflate(black_box(&data), level).unwrap());
        });
    }
    group.finish();
}

fn bench_compress_patterns(c: &mut Criterion) {
    let size = 256 * 1024;
    let patterns: [(&str, Vec<u8>); 3] = [
        ("uniform", test_data::uniform(size)),
        ("random", test_data::random(size)),
        ("text", test_data::text_like(size)),
    ];

    let mut group = c.benchmark_group("compress_patterns");
    group.throughput(Throughput::Bytes(size as u64));

    for (name, data) in &patterns {
        group.bench_with_input(BenchmarkId::from_parameter(name), data, |b, data| {
            b.iter(|| deflate(black_box(data), 6).unwrap());
        });
    }
    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let data = test_data::text_like(256 * 1024);
    let compressed = deflate(&data, 6).unwrap();

    let mut group = c.benchmark_group("decompress");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("text_256k", |b| {
        b.iter(|| inflate(black_box(&compressed)).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compress_levels,
    bench_compress_patterns,
    bench_decompress
);
criterion_main!(benches);
