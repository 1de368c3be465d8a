use criterion::{criterion_group, criterion_main, Criterion};
use roc_rtcp::reception_report::ReceptionReport;
use roc_rtcp::sender_report::SenderReport;
use roc_rtcp::{compose, RtcpPacket};

fn benchmark_compound_roundtrip(c: &mut Criterion) {
    let sr = SenderReport {
        ssrc: 1,
        ntp_timestamp: 42,
        rtp_timestamp: 9000,
        packet_count: 10,
        octet_count: 4410,
        reports: vec![ReceptionReport {
            ssrc: 2,
            fract_loss: 0,
            cum_loss: 0,
            ext_highest_seqnum: 10,
            jitter: 0,
            last_sr: 0,
            delay_since_last_sr: 0,
        }],
    };
    let packets = vec![RtcpPacket::SenderReport(sr)];
    c.bench_function("rtcp compound compose+parse", |b| {
        b.iter(|| {
            let datagram = compose(&packets).unwrap();
            roc_rtcp::parse(&datagram).unwrap()
        })
    });
}

criterion_group!(benches, benchmark_compound_roundtrip);
criterion_main!(benches);
