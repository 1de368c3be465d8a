//! Packetizer (sender, spec §4.1): slices accumulated audio frames into
//! fixed-size RTP packets.

use roc_audio::{Frame, FrameWriter, SampleSpec};
use roc_packet::views::RtpView;
use roc_packet::{Packet, PacketSink};
use roc_shared::error::Result;
use roc_shared::time::Nanos;
use std::time::Instant;

/// A `write()` arriving later than this multiple of the frame it should have
/// carried is treated as a gap in capture, not just scheduling jitter.
const GAP_TOLERANCE_FACTOR: u32 = 2;

pub struct Packetizer<S: PacketSink> {
    sink: S,
    spec: SampleSpec,
    payload_type: u8,
    samples_per_packet: usize,
    ssrc: u32,
    seqnum: u16,
    timestamp: u32,
    accumulator: Vec<f32>,
    accumulator_capture_ts: Nanos,
    started: bool,
    expecting_marker: bool,
    last_write_at: Option<Instant>,
    packets_sent: u64,
    octets_sent: u64,
}

impl<S: PacketSink> Packetizer<S> {
    pub fn new(sink: S, spec: SampleSpec, payload_type: u8, packet_length_ns: Nanos) -> Self {
        let samples_per_frame =
            roc_shared::time::ns_to_samples(packet_length_ns, spec.sample_rate) as usize;
        Self {
            sink,
            spec,
            payload_type,
            samples_per_packet: samples_per_frame * spec.num_channels(),
            ssrc: rand::random::<u32>(),
            seqnum: rand::random::<u16>(),
            timestamp: rand::random::<u32>(),
            accumulator: Vec::new(),
            accumulator_capture_ts: 0,
            started: false,
            expecting_marker: true,
            last_write_at: None,
            packets_sent: 0,
            octets_sent: 0,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Total RTP packets emitted so far, for the RTCP sender report's
    /// `packet_count` field (spec §4.12).
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Total payload bytes emitted so far, for the RTCP sender report's
    /// `octet_count` field (spec §4.12).
    pub fn octets_sent(&self) -> u64 {
        self.octets_sent
    }

    /// The RTP timestamp the next packet would carry, for the RTCP sender
    /// report's `rtp_timestamp` field (spec §4.12).
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    fn flush_one_packet(&mut self) -> Result<()> {
        let channels = self.spec.num_channels().max(1);
        let payload_samples: Vec<f32> = self.accumulator.drain(..self.samples_per_packet).collect();
        let mut bytes = vec![0u8; payload_samples.len() * 4];
        for (i, s) in payload_samples.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&s.to_ne_bytes());
        }

        let view = RtpView {
            payload_type: self.payload_type,
            ssrc: self.ssrc,
            seqnum: self.seqnum,
            timestamp: self.timestamp,
            marker: self.expecting_marker,
            capture_timestamp: self.accumulator_capture_ts,
            payload: bytes::Bytes::from(bytes),
        };
        self.expecting_marker = false;
        self.seqnum = self.seqnum.wrapping_add(1);
        self.timestamp = self
            .timestamp
            .wrapping_add((self.samples_per_packet / channels) as u32);

        self.packets_sent += 1;
        self.octets_sent += payload_samples.len() as u64 * 4;

        let packet = roc_rtp::codec::prepare(view, self.accumulator_capture_ts);
        self.sink.write(packet)
    }
}

impl<S: PacketSink> FrameWriter for Packetizer<S> {
    /// Appends `frame`'s samples into the accumulator, flushing one packet
    /// per `samples_per_packet` reached. A gap since the last frame (or the
    /// very first frame of the stream) sets `marker` on the next packet
    /// emitted (spec §4.1). The gap is detected at this, the packetizer's own
    /// input boundary: a source frame of `n` samples is expected roughly
    /// every `n / sample_rate` seconds of wall-clock time, so a `write()`
    /// call arriving much later than that means capture itself stalled, not
    /// just that this call got sent on time.
    fn write(&mut self, frame: &Frame) -> Result<()> {
        let now = Instant::now();
        if !self.started {
            self.started = true;
            self.expecting_marker = true;
        } else if let Some(last) = self.last_write_at {
            let channels = self.spec.num_channels().max(1);
            let expected = roc_shared::time::samples_to_ns(
                (frame.num_samples() / channels) as u64,
                self.spec.sample_rate,
            );
            let elapsed = now.saturating_duration_since(last).as_nanos() as Nanos;
            if elapsed > expected.saturating_mul(GAP_TOLERANCE_FACTOR as Nanos) {
                self.expecting_marker = true;
            }
        }
        self.last_write_at = Some(now);
        if self.accumulator.is_empty() {
            self.accumulator_capture_ts = frame.capture_timestamp;
        }
        self.accumulator.extend_from_slice(frame.samples());
        while self.accumulator.len() >= self.samples_per_packet {
            self.flush_one_packet()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roc_audio::ChannelSet;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct VecSink(Arc<Mutex<Vec<Packet>>>);

    impl PacketSink for VecSink {
        fn write(&mut self, packet: Packet) -> Result<()> {
            self.0.lock().unwrap().push(packet);
            Ok(())
        }
    }

    #[test]
    fn emits_one_packet_per_full_accumulator() {
        let spec = SampleSpec::new(1000, ChannelSet::mono());
        let sink = VecSink::default();
        let packets = sink.0.clone();
        let mut packetizer = Packetizer::new(sink, spec, 11, 10_000_000); // 10ms -> 10 samples
        let mut frame = Frame::new(10);
        frame.samples_mut().fill(0.5);
        packetizer.write(&frame).unwrap();
        assert_eq!(packets.lock().unwrap().len(), 1);
        let pkt = packets.lock().unwrap()[0].clone();
        assert!(pkt.rtp().unwrap().marker);
    }

    #[test]
    fn seqnum_and_timestamp_advance() {
        let spec = SampleSpec::new(1000, ChannelSet::mono());
        let sink = VecSink::default();
        let packets = sink.0.clone();
        let mut packetizer = Packetizer::new(sink, spec, 11, 10_000_000);
        let mut frame = Frame::new(10);
        frame.samples_mut().fill(0.1);
        for _ in 0..3 {
            packetizer.write(&frame).unwrap();
        }
        let got = packets.lock().unwrap();
        let seqs: Vec<u16> = got.iter().map(|p| p.rtp().unwrap().seqnum).collect();
        assert_eq!(seqs[1], seqs[0].wrapping_add(1));
        assert_eq!(seqs[2], seqs[1].wrapping_add(1));
        let ts: Vec<u32> = got.iter().map(|p| p.rtp().unwrap().timestamp).collect();
        assert_eq!(ts[1], ts[0].wrapping_add(10));
    }
}
