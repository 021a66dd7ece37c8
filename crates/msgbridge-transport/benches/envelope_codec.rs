//! Envelope codec benchmarks
//!
//! Measures the default JSON codec on the engine's hot path: encoding an
//! outbound envelope, and decoding plus validating an inbound one.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use msgbridge_transport::{Codec, Envelope, JsonCodec};
use serde_json::json;

fn sample_envelope(items: usize) -> Envelope {
    let payload: Vec<_> = (0..items)
        .map(|i| json!({"id": i, "name": format!("item-{}", i), "active": i % 2 == 0}))
        .collect();
    Envelope::request(json!({"type": "batch", "payload": payload}), 42)
}

fn bench_encode(c: &mut Criterion) {
    let codec = JsonCodec::new();
    let mut group = c.benchmark_group("envelope_encode");

    for items in [1usize, 32, 1024] {
        let envelope = sample_envelope(items);
        let size = codec.encode(&envelope).map(|s| s.len()).unwrap_or(0);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &envelope, |b, e| {
            b.iter(|| codec.encode(black_box(e)))
        });
    }

    group.finish();
}

fn bench_decode_validate(c: &mut Criterion) {
    let codec = JsonCodec::new();
    let mut group = c.benchmark_group("envelope_decode_validate");

    for items in [1usize, 32, 1024] {
        let Ok(raw) = codec.encode(&sample_envelope(items)) else {
            continue;
        };
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &raw, |b, raw| {
            b.iter(|| {
                codec
                    .decode(black_box(raw))
                    .ok()
                    .map(Envelope::from_value)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_validate);
criterion_main!(benches);
