//! RTP wire header codec and the closed payload-type format map (spec §6).

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod codec;
pub mod format_map;
pub mod header;

pub use codec::RtpCodec;
pub use format_map::{lookup_static, raw_float_format, PayloadFormat};
pub use header::RtpHeader;
