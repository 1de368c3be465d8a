use criterion::{criterion_group, criterion_main, Criterion};
use roc_audio::resampler::SincResampler;

fn benchmark_produce(c: &mut Criterion) {
    let mut resampler = SincResampler::new(2);
    resampler.set_scaling(44100, 48000, 1.0);
    let input = vec![0.1f32; 4096 * 2];
    let mut output = vec![0.0f32; 4096 * 2];
    resampler.push_input(&input);
    c.bench_function("sinc resampler produce", |b| {
        b.iter(|| {
            resampler.push_input(&input);
            resampler.produce(&mut output)
        })
    });
}

criterion_group!(benches, benchmark_produce);
criterion_main!(benches);
