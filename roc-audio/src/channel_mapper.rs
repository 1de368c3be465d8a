//! Converts frames between channel sets (spec §4.13 "Channel mapper").
//!
//! For every output channel position, the mapper either copies from the
//! corresponding input position (present in both sets), mixes down from
//! several input positions using fixed coefficients, or up-mixes to
//! multiple outputs. Coefficients follow the common ITU down-mix
//! convention (center ≈ 0.707·(FL+FR) when center is missing).

use crate::frame::Frame;
use crate::sample_spec::{ChannelPos, ChannelSet};
use roc_shared::error::{Error, Result};

const ALL_POSITIONS: [ChannelPos; 13] = [
    ChannelPos::FrontLeft,
    ChannelPos::FrontRight,
    ChannelPos::FrontCenter,
    ChannelPos::Lfe,
    ChannelPos::BackLeft,
    ChannelPos::BackRight,
    ChannelPos::BackCenter,
    ChannelPos::SideLeft,
    ChannelPos::SideRight,
    ChannelPos::TopFrontLeft,
    ChannelPos::TopFrontRight,
    ChannelPos::TopBackLeft,
    ChannelPos::TopBackRight,
];

/// ≈ 1/√2, the standard center-channel down-mix coefficient.
const DOWNMIX_COEF: f32 = 0.707_106_77;

#[derive(Debug, Clone)]
enum OutputRule {
    Copy(usize),
    Mix(Vec<(usize, f32)>),
    Zero,
}

#[derive(Clone)]
pub struct ChannelMapper {
    in_channels: ChannelSet,
    out_channels: ChannelSet,
    in_positions: Vec<u8>,
    out_positions: Vec<u8>,
    rules: Vec<OutputRule>,
}

impl ChannelMapper {
    pub fn new(in_channels: ChannelSet, out_channels: ChannelSet) -> Self {
        let in_positions: Vec<u8> = in_channels.positions().collect();
        let out_positions: Vec<u8> = out_channels.positions().collect();

        let index_of = |positions: &[u8], pos: ChannelPos| {
            positions.iter().position(|&p| p == pos as u8)
        };

        let rules = out_positions
            .iter()
            .map(|&out_idx_pos| {
                let out_pos = ALL_POSITIONS
                    .iter()
                    .find(|p| **p as u8 == out_idx_pos)
                    .copied();
                if let Some(idx) = in_positions.iter().position(|&p| p == out_idx_pos) {
                    return OutputRule::Copy(idx);
                }
                match out_pos {
                    Some(ChannelPos::FrontCenter) => {
                        match (
                            index_of(&in_positions, ChannelPos::FrontLeft),
                            index_of(&in_positions, ChannelPos::FrontRight),
                        ) {
                            (Some(l), Some(r)) => {
                                OutputRule::Mix(vec![(l, DOWNMIX_COEF), (r, DOWNMIX_COEF)])
                            }
                            _ => OutputRule::Zero,
                        }
                    }
                    Some(ChannelPos::FrontLeft) | Some(ChannelPos::FrontRight) => {
                        match index_of(&in_positions, ChannelPos::FrontCenter) {
                            Some(c) => OutputRule::Mix(vec![(c, 1.0)]),
                            None => OutputRule::Zero,
                        }
                    }
                    Some(ChannelPos::BackLeft) => source_or_zero(&in_positions, ChannelPos::SideLeft),
                    Some(ChannelPos::BackRight) => source_or_zero(&in_positions, ChannelPos::SideRight),
                    Some(ChannelPos::SideLeft) => source_or_zero(&in_positions, ChannelPos::BackLeft),
                    Some(ChannelPos::SideRight) => source_or_zero(&in_positions, ChannelPos::BackRight),
                    Some(ChannelPos::TopFrontLeft) => source_or_zero(&in_positions, ChannelPos::FrontLeft),
                    Some(ChannelPos::TopFrontRight) => source_or_zero(&in_positions, ChannelPos::FrontRight),
                    Some(ChannelPos::TopBackLeft) => {
                        first_available(&in_positions, &[ChannelPos::BackLeft, ChannelPos::SideLeft])
                    }
                    Some(ChannelPos::TopBackRight) => {
                        first_available(&in_positions, &[ChannelPos::BackRight, ChannelPos::SideRight])
                    }
                    _ => OutputRule::Zero,
                }
            })
            .collect();

        Self {
            in_channels,
            out_channels,
            in_positions,
            out_positions,
            rules,
        }
    }

    /// Maps `in_frame` into `out_frame`. Both frames must already be sized
    /// to a whole number of sample-frames for their respective channel
    /// counts, and must cover the same number of sample-frames.
    pub fn map(&self, in_frame: &Frame, out_frame: &mut Frame) -> Result<()> {
        let in_count = self.in_positions.len().max(1);
        let out_count = self.out_positions.len().max(1);

        if in_frame.num_samples() % in_count != 0 {
            return Err(Error::BadConfig("channel mapper: unexpected input frame size".into()));
        }
        if out_frame.num_samples() % out_count != 0 {
            return Err(Error::BadConfig("channel mapper: unexpected output frame size".into()));
        }
        let in_n = in_frame.num_samples() / in_count;
        let out_n = out_frame.num_samples() / out_count;
        if in_n != out_n {
            return Err(Error::BadConfig("channel mapper: mismatching frame sizes".into()));
        }

        let in_samples = in_frame.samples();
        let out_samples = out_frame.samples_mut();

        for s in 0..in_n {
            for (out_ch, rule) in self.rules.iter().enumerate() {
                let value = match rule {
                    OutputRule::Copy(in_ch) => in_samples[s * in_count + in_ch],
                    OutputRule::Mix(terms) => terms
                        .iter()
                        .map(|(in_ch, coef)| in_samples[s * in_count + in_ch] * coef)
                        .sum(),
                    OutputRule::Zero => 0.0,
                };
                out_samples[s * out_count + out_ch] = value;
            }
        }

        out_frame.flags = in_frame.flags;
        out_frame.capture_timestamp = in_frame.capture_timestamp;
        out_frame.duration = in_frame.duration;
        Ok(())
    }

    pub fn input_channels(&self) -> ChannelSet {
        self.in_channels
    }

    pub fn output_channels(&self) -> ChannelSet {
        self.out_channels
    }
}

fn source_or_zero(in_positions: &[u8], pos: ChannelPos) -> OutputRule {
    match in_positions.iter().position(|&p| p == pos as u8) {
        Some(idx) => OutputRule::Mix(vec![(idx, 1.0)]),
        None => OutputRule::Zero,
    }
}

fn first_available(in_positions: &[u8], candidates: &[ChannelPos]) -> OutputRule {
    for &c in candidates {
        if let Some(idx) = in_positions.iter().position(|&p| p == c as u8) {
            return OutputRule::Mix(vec![(idx, 1.0)]);
        }
    }
    OutputRule::Zero
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_spec::ChannelSet;

    #[test]
    fn identity_when_sets_equal() {
        let mapper = ChannelMapper::new(ChannelSet::stereo(), ChannelSet::stereo());
        let input = Frame::from_samples(vec![0.1, -0.2, 0.3, -0.4]);
        let mut output = Frame::new(4);
        mapper.map(&input, &mut output).unwrap();
        assert_eq!(output.samples(), input.samples());
    }

    #[test]
    fn mono_downmix_is_center_of_stereo() {
        let mapper = ChannelMapper::new(ChannelSet::stereo(), ChannelSet::mono());
        let input = Frame::from_samples(vec![1.0, 1.0]);
        let mut output = Frame::new(1);
        mapper.map(&input, &mut output).unwrap();
        assert!((output.samples()[0] - (2.0 * DOWNMIX_COEF)).abs() < 1e-5);
    }

    #[test]
    fn surround_roundtrip_preserves_center_channel() {
        let wide = ChannelMapper::new(ChannelSet::surround_7_1_4(), ChannelSet::mono());
        let narrow = ChannelMapper::new(ChannelSet::mono(), ChannelSet::surround_7_1_4());

        let n_channels = ChannelSet::surround_7_1_4().num_channels();
        let input = Frame::from_samples(vec![0.5; n_channels]);
        let mut mono = Frame::new(1);
        wide.map(&input, &mut mono).unwrap();
        assert!(mono.samples()[0].is_finite());
        assert_ne!(mono.samples()[0], 0.0);

        let mut back = Frame::new(n_channels);
        narrow.map(&mono, &mut back).unwrap();
        for s in back.samples() {
            assert!(s.is_finite());
        }
        // Center position round-trips exactly since it exists in both sets.
        let center_idx = ChannelSet::surround_7_1_4()
            .positions()
            .position(|p| p == ChannelPos::FrontCenter as u8)
            .unwrap();
        assert!((back.samples()[center_idx] - mono.samples()[0]).abs() < 1e-6);
    }
}
