use criterion::{criterion_group, criterion_main, Criterion};
use roc_rtp::header::{compose, parse, RtpHeader};

fn benchmark_roundtrip(c: &mut Criterion) {
    let header = RtpHeader {
        marker: false,
        payload_type: 10,
        seqnum: 1,
        timestamp: 160,
        ssrc: 0xdead_beef,
    };
    let payload = vec![0u8; 320];
    c.bench_function("rtp header compose+parse", |b| {
        b.iter(|| {
            let datagram = compose(&header, &payload).unwrap();
            parse(&datagram).unwrap()
        })
    });
}

criterion_group!(benches, benchmark_roundtrip);
criterion_main!(benches);
