//! Производительность горячих участков конвертации: масштабирование,
//! построение заголовка и запись артефакта.

use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tdms2bin_core::{scale_channel, BinaryEmitter, ChannelArtifact, HeaderRecord, ScalingCoefficients};
use tdms2bin_types::Channel;

fn random_channel(n: usize) -> Channel {
    let mut rng = StdRng::seed_from_u64(42);
    let samples = (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect();

    Channel::with_samples("Dev1/ai0", samples)
}

fn bench_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale_channel");
    let coeffs = ScalingCoefficients::new(0.5, 3.2);

    for n in [1_000usize, 100_000, 1_000_000] {
        let channel = random_channel(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &channel, |b, ch| {
            b.iter(|| scale_channel(black_box(ch), black_box(&coeffs)))
        });
    }

    group.finish();
}

fn bench_header(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_micro_opt(0, 0, 0, 123_456))
        .unwrap_or_default();

    c.bench_function("header_build", |b| {
        b.iter(|| HeaderRecord::build(black_box(51_200.0), black_box(start), black_box(1_000_000)))
    });
}

fn bench_write(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let emitter = BinaryEmitter::new(dir.path().join("bench"));
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let n = 1_000_000;
    let channel = random_channel(n);
    let samples = scale_channel(&channel, &ScalingCoefficients::IDENTITY).unwrap();
    let header = HeaderRecord::build(1_000.0, start, n).unwrap();
    let artifact = ChannelArtifact::new("Dev1/ai0", header, samples);

    let mut group = c.benchmark_group("emit");
    group.throughput(Throughput::Bytes(artifact.byte_len() as u64));
    group.sample_size(20);
    group.bench_function("write_1M", |b| b.iter(|| emitter.write(black_box(&artifact))));
    group.finish();
}

criterion_group!(benches, bench_scale, bench_header, bench_write);
criterion_main!(benches);
