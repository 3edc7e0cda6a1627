// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for pianorec
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Variable-length quantity encoding
//! - Capture throughput on the input path
//! - Full export of long recordings

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::{Duration, Instant};

use pianorec::recording::{encode_smf, write_variable_length, CaptureSession, CapturedEvent};
use pianorec::timing::TempoSignature;

fn bench_variable_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("variable_length");

    for value in [0u32, 127, 480, 16_384, 0x0FFF_FFFF].iter() {
        group.bench_with_input(BenchmarkId::new("write", value), value, |b, &value| {
            let mut buffer = Vec::with_capacity(4);
            b.iter(|| {
                buffer.clear();
                write_variable_length(&mut buffer, black_box(value)).unwrap();
                black_box(buffer.len())
            })
        });
    }

    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let messages: [&[u8]; 4] = [&[0x90, 60, 100], &[0xB0, 64, 127], &[0xB0, 20, 5], &[0x80, 60, 0]];

    c.bench_function("ingest_1000", |b| {
        b.iter_batched(
            || {
                let mut session = CaptureSession::new();
                session.start();
                session
            },
            |mut session| {
                let start = Instant::now();
                for i in 0..1000u64 {
                    let data = messages[(i % 4) as usize];
                    session.ingest_at(black_box(data), start + Duration::from_millis(i));
                }
                black_box(session.len())
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    let tempo = TempoSignature::new(120, 4, 4);

    for size in [100usize, 1_000, 10_000].iter() {
        // Interleaved, slightly out of order, like two devices on one session
        let events: Vec<CapturedEvent> = (0..*size)
            .map(|i| {
                let t = (i as f64) * 12.5 + if i % 2 == 0 { 3.0 } else { 0.0 };
                if i % 2 == 0 {
                    CapturedEvent::note_on(t, 0, (36 + i % 48) as u8, 100)
                } else {
                    CapturedEvent::note_off(t, 0, (36 + (i - 1) % 48) as u8, 0)
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("encode", size), &events, |b, events| {
            b.iter(|| black_box(encode_smf(events, tempo).unwrap().len()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_variable_length, bench_ingest, bench_export);
criterion_main!(benches);
