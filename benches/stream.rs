//! Criterion benchmarks for the streaming compress/decompress pipeline.
//!
//! Run with:
//!   cargo bench --bench stream

use std::io::{Read, Write};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use zstdio::{functions, CompressionQuality, ZstdReader, ZstdWriter};

/// Deterministic mixed corpus: compressible text with periodic noise.
fn corpus(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut state = 0x9E37_79B9u32;
    while out.len() < len {
        out.extend_from_slice(b"the quick brown fox jumps over the lazy dog ");
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        out.push((state >> 24) as u8);
    }
    out.truncate(len);
    out
}

fn bench_stream_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_roundtrip");
    let payload = corpus(4 * 1024 * 1024);
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for quality in [
        CompressionQuality::Fastest,
        CompressionQuality::Default,
        CompressionQuality::Maximum,
    ] {
        group.bench_with_input(
            BenchmarkId::new("writer", format!("{quality:?}")),
            &payload,
            |b, payload| {
                b.iter(|| {
                    let mut writer =
                        ZstdWriter::with_quality(Vec::new(), quality).unwrap();
                    writer.write_all(payload).unwrap();
                    writer.finish().unwrap()
                })
            },
        );
    }

    let compressed = functions::compress(&payload, 3).unwrap();
    group.bench_with_input(
        BenchmarkId::new("reader", "level3"),
        &compressed,
        |b, compressed| {
            b.iter(|| {
                let mut reader = ZstdReader::new(&compressed[..]).unwrap();
                let mut out = Vec::with_capacity(payload.len());
                reader.read_to_end(&mut out).unwrap();
                out
            })
        },
    );

    group.finish();
}

criterion_group!(benches, bench_stream_roundtrip);
criterion_main!(benches);
