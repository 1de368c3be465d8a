//! Parser/composer interface (spec §3 "Packet"): a packet is created by a
//! parser on receive or a composer on send.

use crate::packet::Packet;
use bytes::Bytes;
use roc_shared::error::Result;
use std::net::SocketAddr;

/// Parses a raw datagram into a [`Packet`] with its recognized sub-views
/// attached. Implemented per protocol (`roc-rtp`'s RTP parser, `roc-rtcp`'s
/// RTCP parser, the FEC header/footer parser in `roc-fec`).
pub trait PacketParser: Send + Sync {
    fn parse(&self, data: Bytes, source: SocketAddr, destination: SocketAddr) -> Result<Packet>;
}

/// Serializes a [`Packet`]'s sub-views into wire bytes, setting the
/// `Composed` flag on success.
pub trait PacketComposer: Send + Sync {
    fn compose(&self, packet: &Packet) -> Result<Bytes>;
}

/// The packet-domain analogue of `roc_audio::FrameWriter`: the seam every
/// pipeline stage that forwards packets downstream is built against
/// (packetizer → FEC writer → interleaver → router, spec §4.1-§4.4).
pub trait PacketSink: Send {
    fn write(&mut self, packet: Packet) -> Result<()>;
}

/// The packet-domain analogue of `roc_audio::FrameReader`.
pub trait PacketSource: Send {
    fn read(&mut self) -> Result<Option<Packet>>;
}

/// Lets a trait object stand in for a concrete sink, so a facade can wire a
/// variable-depth chain (packetizer -> FEC writer -> interleaver -> router)
/// without naming its full generic type.
impl PacketSink for Box<dyn PacketSink> {
    fn write(&mut self, packet: Packet) -> Result<()> {
        (**self).write(packet)
    }
}
