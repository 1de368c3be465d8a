//! Depacketizer (receiver, spec §4.7): reassembles ordered RTP packets
//! into sample frames, zero-filling (or tone-filling) any uncovered range.

use std::collections::BTreeMap;

use roc_audio::{Frame, FrameFlags};
use roc_packet::{Packet, PacketFlags};
use roc_shared::error::Result;
use roc_shared::time::{samples_to_ns, Nanos};

const DEFAULT_MAX_TS_JUMP_SAMPLES: u32 = 1; // multiplied by sample_rate by caller

pub struct DepacketizerConfig {
    pub sample_rate: u32,
    pub num_channels: usize,
    pub max_ts_jump: u32,
    pub debug_tone_fill: bool,
}

impl DepacketizerConfig {
    pub fn new(sample_rate: u32, num_channels: usize) -> Self {
        Self {
            sample_rate,
            num_channels,
            max_ts_jump: sample_rate.saturating_mul(DEFAULT_MAX_TS_JUMP_SAMPLES),
            debug_tone_fill: false,
        }
    }
}

pub struct Depacketizer {
    config: DepacketizerConfig,
    stream_position: u64,
    packets: BTreeMap<u32, Packet>,
    last_timestamp: Option<u32>,
    missing_samples: u64,
    tone_phase: f64,
}

impl Depacketizer {
    pub fn new(config: DepacketizerConfig) -> Self {
        Self {
            config,
            stream_position: 0,
            packets: BTreeMap::new(),
            last_timestamp: None,
            missing_samples: 0,
            tone_phase: 0.0,
        }
    }

    pub fn missing_samples(&self) -> u64 {
        self.missing_samples
    }

    /// Feeds one ordered, validated RTP packet (rejection of packets whose
    /// timestamp jumps by more than `max_ts_jump` happens upstream, per
    /// spec §4.7 edge cases — this only tracks the validator's decision
    /// for `marker`-driven resets).
    pub fn push(&mut self, packet: Packet) {
        let Some(rtp) = packet.rtp() else { return };
        if let Some(last) = self.last_timestamp {
            let jump = rtp.timestamp.wrapping_sub(last);
            if !rtp.marker && jump > self.config.max_ts_jump {
                return;
            }
        }
        self.last_timestamp = Some(rtp.timestamp);
        self.packets.insert(rtp.timestamp, packet);
    }

    /// Fills `frame` (already allocated to the requested sample count) by
    /// stitching together every packet whose span overlaps the advancing
    /// `stream_position`, per spec §4.7 steps 1-5.
    pub fn read(&mut self, frame: &mut Frame) -> Result<()> {
        let channels = self.config.num_channels.max(1);
        let frame_samples_per_channel = frame.num_samples() / channels;
        let range_start = self.stream_position;
        let range_end = range_start + frame_samples_per_channel as u64;

        let mut covered = vec![false; frame_samples_per_channel];
        let mut restored = false;
        let mut drops = false;
        let mut capture_ts: Option<Nanos> = None;

        let overlapping: Vec<u32> = self
            .packets
            .keys()
            .copied()
            .filter(|&ts| {
                let start = ts as u64;
                let samples = self.packet_samples(ts);
                let end = start + samples as u64;
                end > range_start && start < range_end
            })
            .collect();

        for ts in overlapping {
            let packet = self.packets.remove(&ts).unwrap();
            let rtp = packet.rtp().unwrap();
            let samples = rtp.payload.len() / 4 / channels;
            let pkt_start = ts as u64;
            for i in 0..samples {
                let abs_pos = pkt_start + i as u64;
                if abs_pos < range_start || abs_pos >= range_end {
                    continue;
                }
                let frame_idx = (abs_pos - range_start) as usize;
                for ch in 0..channels {
                    let byte_off = (i * channels + ch) * 4;
                    if byte_off + 4 > rtp.payload.len() {
                        continue;
                    }
                    let mut buf = [0u8; 4];
                    buf.copy_from_slice(&rtp.payload[byte_off..byte_off + 4]);
                    frame.samples_mut()[frame_idx * channels + ch] = f32::from_ne_bytes(buf);
                }
                covered[frame_idx] = true;
            }
            if packet.has_flags(PacketFlags::RESTORED) {
                restored = true;
            }
            if capture_ts.is_none() {
                let offset_samples = range_start.saturating_sub(pkt_start);
                capture_ts = Some(
                    rtp.capture_timestamp + samples_to_ns(offset_samples, self.config.sample_rate),
                );
            }
        }

        let missing: usize = covered.iter().filter(|c| !**c).count();
        if missing > 0 {
            self.missing_samples += missing as u64;
            drops = true;
            for (i, is_covered) in covered.iter().enumerate() {
                if *is_covered {
                    continue;
                }
                for ch in 0..channels {
                    frame.samples_mut()[i * channels + ch] = 0.0;
                }
            }
            if self.config.debug_tone_fill {
                frame.debug_fill(self.config.sample_rate, channels, &mut self.tone_phase);
            }
            frame.flags.insert(FrameFlags::INCOMPLETE);
            if missing == frame_samples_per_channel {
                frame.flags.insert(FrameFlags::BLANK);
            }
        }
        if restored {
            frame.flags.insert(FrameFlags::RESTORED);
        }
        if drops {
            frame.flags.insert(FrameFlags::DROPS);
        }
        frame.capture_timestamp = capture_ts.unwrap_or(0);
        frame.duration = frame_samples_per_channel as u64;

        self.stream_position = range_end;
        Ok(())
    }

    fn packet_samples(&self, ts: u32) -> usize {
        self.packets
            .get(&ts)
            .and_then(|p| p.rtp())
            .map(|rtp| rtp.payload.len() / 4 / self.config.num_channels.max(1))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use roc_packet::views::RtpView;

    fn make_packet(ts: u32, samples: &[f32]) -> Packet {
        let mut bytes = Vec::with_capacity(samples.len() * 4);
        for s in samples {
            bytes.extend_from_slice(&s.to_ne_bytes());
        }
        let p = Packet::empty();
        p.set_rtp(RtpView {
            payload_type: 11,
            ssrc: 1,
            seqnum: 0,
            timestamp: ts,
            marker: ts == 0,
            capture_timestamp: ts as u64 * 1000,
            payload: Bytes::from(bytes),
        });
        p
    }

    #[test]
    fn fills_fully_covered_frame_without_flags() {
        let mut dp = Depacketizer::new(DepacketizerConfig::new(1000, 1));
        dp.push(make_packet(0, &[1.0, 2.0, 3.0, 4.0]));
        let mut frame = Frame::new(4);
        dp.read(&mut frame).unwrap();
        assert_eq!(frame.samples(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(!frame.flags.contains(FrameFlags::INCOMPLETE));
    }

    #[test]
    fn marks_incomplete_and_blank_on_total_gap() {
        let mut dp = Depacketizer::new(DepacketizerConfig::new(1000, 1));
        let mut frame = Frame::new(4);
        dp.read(&mut frame).unwrap();
        assert_eq!(frame.samples(), &[0.0, 0.0, 0.0, 0.0]);
        assert!(frame.flags.contains(FrameFlags::INCOMPLETE));
        assert!(frame.flags.contains(FrameFlags::BLANK));
    }

    #[test]
    fn partial_gap_sets_incomplete_but_not_blank() {
        let mut dp = Depacketizer::new(DepacketizerConfig::new(1000, 1));
        dp.push(make_packet(0, &[1.0, 2.0]));
        let mut frame = Frame::new(4);
        dp.read(&mut frame).unwrap();
        assert_eq!(&frame.samples()[..2], &[1.0, 2.0]);
        assert!(frame.flags.contains(FrameFlags::INCOMPLETE));
        assert!(!frame.flags.contains(FrameFlags::BLANK));
    }
}
