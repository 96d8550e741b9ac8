//! Criterion benchmarks for the block compression adapter.
//!
//! Run with:
//!   cargo bench --bench block
//!
//! Measures the plain pipeline, the heuristic wrapper on compressible and
//! incompressible inputs (the latter is where early abort earns its keep),
//! and decompression, at the block sizes the storage layer actually issues.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zblock::{BlockAdapter, BlockLevel};

/// Text-like, highly compressible filler.
fn compressible(len: usize) -> Vec<u8> {
    let phrase = b"a stitch in time saves nine / many hands make light work / ";
    phrase.iter().copied().cycle().take(len).collect()
}

/// xorshift64 noise — incompressible, reproducible.
fn incompressible(len: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

fn bench_compress(c: &mut Criterion) {
    let adapter = BlockAdapter::new();
    let mut group = c.benchmark_group("compress");

    for &size in &[4_096usize, 131_072] {
        let data = compressible(size);
        let mut dst = vec![0u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        for level in [BlockLevel::Level1, BlockLevel::Level3, BlockLevel::Level9] {
            group.bench_with_input(
                BenchmarkId::new(format!("plain_{level}"), size),
                &data,
                |b, data| b.iter(|| adapter.compress(data, &mut dst, level.raw())),
            );
        }
    }
    group.finish();
}

fn bench_heuristic(c: &mut Criterion) {
    let adapter = BlockAdapter::new();
    let mut group = c.benchmark_group("heuristic");
    let size = 131_072usize;
    group.throughput(Throughput::Bytes(size as u64));

    // The win case: incompressible data aborts before zstd-9 ever runs.
    let noise = incompressible(size);
    let mut dst = vec![0u8; size];
    group.bench_with_input(BenchmarkId::new("incompressible_l9", size), &noise, |b, data| {
        b.iter(|| adapter.compress_with_heuristic(data, &mut dst, 9))
    });

    // The cost case: compressible data pays for the LZ4 probe and then
    // compresses anyway.
    let text = compressible(size);
    group.bench_with_input(BenchmarkId::new("compressible_l9", size), &text, |b, data| {
        b.iter(|| adapter.compress_with_heuristic(data, &mut dst, 9))
    });

    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let adapter = BlockAdapter::new();
    let mut group = c.benchmark_group("decompress");

    for &size in &[4_096usize, 131_072] {
        let data = compressible(size);
        let mut frame = vec![0u8; size];
        let produced = adapter.compress(&data, &mut frame, BlockLevel::DEFAULT.raw());
        assert!(produced < size);
        frame.truncate(produced);

        let mut out = vec![0u8; size];
        // Throughput in decompressed bytes — the meaningful quantity.
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("oneshot", size), &frame, |b, frame| {
            b.iter(|| adapter.decompress(frame, &mut out).expect("decompress"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compress, bench_heuristic, bench_decompress);
criterion_main!(benches);
