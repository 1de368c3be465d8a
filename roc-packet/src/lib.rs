#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod flags;
pub mod packet;
pub mod seq;
pub mod traits;
pub mod views;

pub use flags::PacketFlags;
pub use packet::Packet;
pub use seq::{SeqExtender, seq_lt};
pub use traits::{PacketComposer, PacketParser, PacketSink, PacketSource};
pub use views::{FecScheme, FecView, RtcpView, RtpView, UdpView};
