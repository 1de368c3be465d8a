use bytes::Bytes;
use criterion::{criterion_group, criterion_main, Criterion};
use roc_packet::views::RtpView;
use roc_packet::{Packet, PacketSink};
use roc_pipeline::depacketizer::{Depacketizer, DepacketizerConfig};
use roc_shared::error::Result;

#[derive(Clone, Default)]
struct NullSink;

impl PacketSink for NullSink {
    fn write(&mut self, _packet: Packet) -> Result<()> {
        Ok(())
    }
}

fn benchmark_depacketizer(c: &mut Criterion) {
    c.bench_function("depacketizer 10ms frame", |b| {
        b.iter(|| {
            let mut dp = Depacketizer::new(DepacketizerConfig::new(44100, 2));
            let samples = vec![0.1f32; 441 * 2];
            let mut bytes = Vec::with_capacity(samples.len() * 4);
            for s in &samples {
                bytes.extend_from_slice(&s.to_ne_bytes());
            }
            let packet = Packet::empty();
            packet.set_rtp(RtpView {
                payload_type: 10,
                ssrc: 1,
                seqnum: 0,
                timestamp: 0,
                marker: true,
                capture_timestamp: 0,
                payload: Bytes::from(bytes),
            });
            dp.push(packet);
            let mut frame = roc_audio::Frame::new(441 * 2);
            dp.read(&mut frame).unwrap();
        })
    });
}

criterion_group!(benches, benchmark_depacketizer);
criterion_main!(benches);
