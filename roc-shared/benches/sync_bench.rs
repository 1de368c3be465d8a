use criterion::{Criterion, criterion_group, criterion_main};
use roc_shared::sync::{MpscQueue, Seqlock};

fn benchmark_seqlock(c: &mut Criterion) {
    let lock = Seqlock::new(0u64);
    c.bench_function("seqlock store+load", |b| {
        b.iter(|| {
            lock.store(42);
            lock.load()
        })
    });
}

fn benchmark_mpsc_push(c: &mut Criterion) {
    let mut queue = MpscQueue::new();
    c.bench_function("mpsc push+pop", |b| {
        b.iter(|| {
            queue.push(1u32);
            queue.pop()
        })
    });
}

criterion_group!(benches, benchmark_seqlock, benchmark_mpsc_push);
criterion_main!(benches);
