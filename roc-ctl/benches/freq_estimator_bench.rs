use criterion::{criterion_group, criterion_main, Criterion};
use roc_ctl::{FreqEstimator, TunerProfile};

fn benchmark_feed(c: &mut Criterion) {
    c.bench_function("freq estimator feed 1000 samples", |b| {
        b.iter(|| {
            let mut est = FreqEstimator::new(TunerProfile::Responsive);
            for i in 0..1000 {
                let err = 0.1 * (i as f64 % 7.0 - 3.0);
                est.feed(err);
            }
        })
    });
}

criterion_group!(benches, benchmark_feed);
criterion_main!(benches);
