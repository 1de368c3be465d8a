//! Reed-Solomon-8m and LDPC-Staircase FEC block codecs (spec §4.2, §4.6,
//! §6): systematic MDS erasure coding over GF(256).

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod block_codec;
pub mod galois;
pub mod matrix;
pub mod payload_id;

pub use block_codec::{decode, encode};
pub use payload_id::PayloadId;
pub use roc_packet::FecScheme;
