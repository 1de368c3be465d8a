use criterion::{criterion_group, criterion_main, Criterion};
use roc_fec::{decode, encode, FecScheme};

fn benchmark_rs8m_block(c: &mut Criterion) {
    let k = 10;
    let m = 5;
    let source: Vec<Vec<u8>> = (0..k).map(|i| vec![i as u8; 1200]).collect();
    c.bench_function("rs8m encode 10+5 x1200B", |b| {
        b.iter(|| encode(FecScheme::ReedSolomon8m, &source, m).unwrap())
    });

    let repair = encode(FecScheme::ReedSolomon8m, &source, m).unwrap();
    let mut available: Vec<(usize, Vec<u8>)> = (m..k).map(|i| (i, source[i].clone())).collect();
    available.extend((0..m).map(|j| (k + j, repair[j].clone())));
    c.bench_function("rs8m decode 10+5 x1200B", |b| {
        b.iter(|| decode(FecScheme::ReedSolomon8m, &available, k, m).unwrap())
    });
}

criterion_group!(benches, benchmark_rs8m_block);
criterion_main!(benches);
