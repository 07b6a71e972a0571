use criterion::{Criterion, black_box, criterion_group, criterion_main};

use adr_core::{classify, classify_with_hysteresis, decode, encode};

// Resistances spread across every half-decade range
fn sweep(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 1e-3 * 10f64.powf(11.5 * i as f64 / n as f64))
        .collect()
}

fn bench_codec(c: &mut Criterion) {
    c.bench_function("encode", |b| {
        b.iter(|| encode(black_box(0x0abc_def0 & 0x0fff_ffff), black_box(32)))
    });

    let frame = encode(0x0abc_def0 & 0x0fff_ffff, 32).unwrap();
    c.bench_function("decode", |b| b.iter(|| decode(black_box(&frame))));
}

fn bench_classify(c: &mut Criterion) {
    let rs = sweep(1024);
    c.bench_function("classify_sweep", |b| {
        b.iter(|| {
            for &r in &rs {
                let _ = black_box(classify(black_box(r)));
            }
        })
    });
    c.bench_function("classify_with_hysteresis_sweep", |b| {
        b.iter(|| {
            for &r in &rs {
                let _ = black_box(classify_with_hysteresis(black_box(r), 1.1));
            }
        })
    });
}

criterion_group!(benches, bench_codec, bench_classify);
criterion_main!(benches);
