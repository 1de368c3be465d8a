//! `SampleSpec`: the currency between every pipeline stage (spec §3
//! "Sample spec"). Every stage advertises input and output specs and
//! rejects mismatches.

use crate::pcm::PcmSubformat;
use roc_shared::error::{Error, Result};

/// A single speaker/channel position. Values double as bit indices into a
/// [`ChannelSet`]'s mask, matching `roc_packet::channel_mask_t` in the
/// original implementation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ChannelPos {
    FrontLeft = 0,
    FrontRight = 1,
    FrontCenter = 2,
    Lfe = 3,
    BackLeft = 4,
    BackRight = 5,
    BackCenter = 6,
    SideLeft = 7,
    SideRight = 8,
    TopFrontLeft = 9,
    TopFrontRight = 10,
    TopBackLeft = 11,
    TopBackRight = 12,
}

pub const CHANNEL_POS_COUNT: usize = 13;

/// How a [`ChannelSet`]'s member positions should be understood: a named
/// surround layout, or an opaque multitrack bundle where positional mixing
/// does not apply.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    Surround,
    Multitrack,
}

/// Channel ordering convention, relevant only for `Surround` layouts with
/// more than two channels (affects which byte offset each position maps to
/// on the wire / in an interleaved frame).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    Smpte,
    Alsa,
    None,
}

/// A set of channel positions plus how to interpret them (spec §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSet {
    pub layout: ChannelLayout,
    pub order: ChannelOrder,
    mask: u32,
}

impl ChannelSet {
    pub fn new(layout: ChannelLayout, order: ChannelOrder, mask: u32) -> Self {
        Self { layout, order, mask }
    }

    pub fn mono() -> Self {
        Self::new(
            ChannelLayout::Surround,
            ChannelOrder::Smpte,
            1 << ChannelPos::FrontCenter as u32,
        )
    }

    pub fn stereo() -> Self {
        Self::new(
            ChannelLayout::Surround,
            ChannelOrder::Smpte,
            (1 << ChannelPos::FrontLeft as u32) | (1 << ChannelPos::FrontRight as u32),
        )
    }

    pub fn surround_5_1() -> Self {
        let mask = [
            ChannelPos::FrontLeft,
            ChannelPos::FrontRight,
            ChannelPos::FrontCenter,
            ChannelPos::Lfe,
            ChannelPos::BackLeft,
            ChannelPos::BackRight,
        ]
        .iter()
        .fold(0u32, |m, p| m | (1 << *p as u32));
        Self::new(ChannelLayout::Surround, ChannelOrder::Smpte, mask)
    }

    pub fn surround_7_1_4() -> Self {
        let mask = [
            ChannelPos::FrontLeft,
            ChannelPos::FrontRight,
            ChannelPos::FrontCenter,
            ChannelPos::Lfe,
            ChannelPos::BackLeft,
            ChannelPos::BackRight,
            ChannelPos::SideLeft,
            ChannelPos::SideRight,
            ChannelPos::TopFrontLeft,
            ChannelPos::TopFrontRight,
            ChannelPos::TopBackLeft,
            ChannelPos::TopBackRight,
        ]
        .iter()
        .fold(0u32, |m, p| m | (1 << *p as u32));
        Self::new(ChannelLayout::Surround, ChannelOrder::Smpte, mask)
    }

    pub fn multitrack(num_tracks: u32) -> Self {
        let mask = if num_tracks >= 32 {
            u32::MAX
        } else {
            (1u32 << num_tracks) - 1
        };
        Self::new(ChannelLayout::Multitrack, ChannelOrder::None, mask)
    }

    pub fn has(&self, pos: ChannelPos) -> bool {
        self.mask & (1 << pos as u32) != 0
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn num_channels(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Iterates the set bits, lowest channel index first, matching the
    /// interleaving order the frame model uses.
    pub fn positions(&self) -> impl Iterator<Item = u8> + '_ {
        (0..32u8).filter(move |b| self.mask & (1 << b) != 0)
    }
}

/// The currency between every pipeline stage (spec §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    pub pcm_subformat: PcmSubformat,
    pub sample_rate: u32,
    pub channels: ChannelSet,
}

impl SampleSpec {
    pub fn new(sample_rate: u32, channels: ChannelSet) -> Self {
        Self {
            pcm_subformat: PcmSubformat::Raw,
            sample_rate,
            channels,
        }
    }

    pub fn with_subformat(mut self, subformat: PcmSubformat) -> Self {
        self.pcm_subformat = subformat;
        self
    }

    /// Returns `Ok(())` if `self` and `other` agree on rate, channel set and
    /// subformat (spec §3: "every stage ... rejects mismatches").
    pub fn require_same(&self, other: &SampleSpec) -> Result<()> {
        if self.sample_rate != other.sample_rate {
            return Err(Error::BadConfig(format!(
                "sample rate mismatch: {} vs {}",
                self.sample_rate, other.sample_rate
            )));
        }
        if self.channels != other.channels {
            return Err(Error::BadConfig(
                "channel set mismatch between pipeline stages".into(),
            ));
        }
        Ok(())
    }

    pub fn num_channels(&self) -> usize {
        self.channels.num_channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_has_two_channels() {
        assert_eq!(ChannelSet::stereo().num_channels(), 2);
        assert!(ChannelSet::stereo().has(ChannelPos::FrontLeft));
        assert!(!ChannelSet::stereo().has(ChannelPos::FrontCenter));
    }

    #[test]
    fn require_same_rejects_rate_mismatch() {
        let a = SampleSpec::new(44100, ChannelSet::stereo());
        let b = SampleSpec::new(48000, ChannelSet::stereo());
        assert!(a.require_same(&b).is_err());
    }
}
