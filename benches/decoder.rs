//! Decoder benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mochi_webterm::parser::Decoder;

fn bench_decode_plain_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder");

    let plain_text = "Hello, World! ".repeat(1000);
    group.throughput(Throughput::Bytes(plain_text.len() as u64));

    group.bench_function("plain_text", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            let units = decoder.decode(black_box(plain_text.as_bytes()));
            black_box(units)
        })
    });

    group.finish();
}

fn bench_decode_csi_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder");

    let csi_heavy = "\x1b[1;31mRed\x1b[0m \x1b[5;10H\x1b[2J".repeat(100);
    group.throughput(Throughput::Bytes(csi_heavy.len() as u64));

    group.bench_function("csi_sequences", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            let units = decoder.decode(black_box(csi_heavy.as_bytes()));
            black_box(units)
        })
    });

    group.finish();
}

fn bench_decode_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder");

    // Sequences cut across small network frames
    let mixed = "Line 1: \x1b[32mOK\x1b[0m\r\nLine 2: \x1b]0;title\x07\x1b[31mERROR\x1b[0m\r\n".repeat(500);
    group.throughput(Throughput::Bytes(mixed.len() as u64));

    group.bench_function("chunked_mixed", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            let mut count = 0;
            for chunk in mixed.as_bytes().chunks(7) {
                decoder.push(black_box(chunk));
                while decoder.next_unit().is_some() {
                    count += 1;
                }
            }
            black_box(count)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_plain_text,
    bench_decode_csi_sequences,
    bench_decode_chunked
);

criterion_main!(benches);
