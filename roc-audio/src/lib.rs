//! Sample format, channel, and rate conversion (spec §4.13-§4.14): the
//! audio-domain half of the pipeline, independent of RTP/FEC transport.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod channel_mapper;
pub mod frame;
pub mod io;
pub mod pcm;
pub mod resampler;
pub mod sample_spec;
pub mod transcoder;

pub use channel_mapper::ChannelMapper;
pub use frame::{Frame, FrameFlags};
pub use io::{FrameReader, FrameWriter, NullWriter};
pub use pcm::{Endian, PcmMapper, PcmSubformat, Sample};
pub use sample_spec::{ChannelLayout, ChannelOrder, ChannelPos, ChannelSet, SampleSpec};
pub use transcoder::{Profiler, ProfilingWriter, Transcoder};
