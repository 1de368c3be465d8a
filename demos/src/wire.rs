//! UDP transport adapters: the socket-facing ends of the
//! [`roc_packet::PacketSink`]/[`roc_packet::PacketSource`] seam (spec §3),
//! standing in for the real network every `roc-*` pipeline stage is built
//! against in tests with an in-process queue instead.

use std::net::{SocketAddr, UdpSocket};

use bytes::{Bytes, BytesMut};
use roc_fec::{FecScheme, PayloadId};
use roc_packet::views::FecView;
use roc_packet::{Packet, PacketComposer, PacketFlags, PacketParser, PacketSink, PacketSource};
use roc_rtp::RtpCodec;
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, Unmarshal};

const MAX_DATAGRAM: usize = 2048;

fn would_block(e: &std::io::Error) -> bool {
    matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

/// Sends RTP source packets to a fixed peer over one UDP socket.
pub struct UdpRtpSink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpRtpSink {
    pub fn new(socket: UdpSocket, dest: SocketAddr) -> Self {
        Self { socket, dest }
    }
}

impl PacketSink for UdpRtpSink {
    fn write(&mut self, packet: Packet) -> Result<()> {
        let bytes = RtpCodec.compose(&packet)?;
        self.socket.send_to(&bytes, self.dest)?;
        Ok(())
    }
}

/// Reads RTP source packets off one UDP socket, non-blocking: a timed-out
/// `recv` surfaces as `Ok(None)` rather than an error (spec §3 "a parser
/// creates a packet on receive").
pub struct UdpRtpSource {
    socket: UdpSocket,
    local: SocketAddr,
}

impl UdpRtpSource {
    pub fn new(socket: UdpSocket) -> Result<Self> {
        let local = socket.local_addr()?;
        Ok(Self { socket, local })
    }
}

impl PacketSource for UdpRtpSource {
    fn read(&mut self) -> Result<Option<Packet>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((n, peer)) => Ok(Some(RtpCodec.parse(Bytes::copy_from_slice(&buf[..n]), peer, self.local)?)),
            Err(e) if would_block(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sends FEC repair packets to a fixed peer over one UDP socket. Repair
/// packets carry no RTP view of their own (spec §4.2), so the wire layout
/// here is just the addressing header (spec §6 "PayloadId") followed by the
/// repair symbol.
pub struct UdpFecSink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpFecSink {
    pub fn new(socket: UdpSocket, dest: SocketAddr) -> Self {
        Self { socket, dest }
    }
}

impl PacketSink for UdpFecSink {
    fn write(&mut self, packet: Packet) -> Result<()> {
        let fec = packet.fec().ok_or(Error::BadOperation)?;
        let id = PayloadId::for_rs8m(fec.source_block_number, fec.encoding_symbol_id, fec.source_block_length, fec.block_length);
        let mut buf = BytesMut::with_capacity(id.marshal_size() + fec.payload.len());
        buf.extend_from_slice(&id.marshal()?);
        buf.extend_from_slice(&fec.payload);
        self.socket.send_to(&buf, self.dest)?;
        Ok(())
    }
}

/// Reads FEC repair packets off one UDP socket, rebuilding the bare
/// `FecView` (no RTP view, `Repair` flag set) `ReceiverSlot::on_packet`
/// expects (spec §4.2, §4.6). `scheme` comes from the endpoint's own
/// configuration, since both FEC schemes share one wire layout (spec §9
/// open question) and can't be told apart from the bytes alone.
pub struct UdpFecSource {
    socket: UdpSocket,
    scheme: FecScheme,
}

impl UdpFecSource {
    pub fn new(socket: UdpSocket, scheme: FecScheme) -> Self {
        Self { socket, scheme }
    }
}

impl PacketSource for UdpFecSource {
    fn read(&mut self) -> Result<Option<Packet>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((n, _peer)) => {
                let mut remaining = Bytes::copy_from_slice(&buf[..n]);
                let id = PayloadId::unmarshal(&mut remaining)?;
                let packet = Packet::empty();
                packet.set_flags(PacketFlags::REPAIR);
                packet.set_fec(FecView {
                    scheme: self.scheme,
                    encoding_symbol_id: id.esi,
                    source_block_number: id.sbn,
                    source_block_length: id.k,
                    block_length: id.block_length(),
                    payload: remaining,
                });
                Ok(Some(packet))
            }
            Err(e) if would_block(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Binds a non-blocking UDP socket at `local`, for either a sink or a
/// source (a demo process only ever does one or the other per socket).
pub fn bind_nonblocking(local: SocketAddr) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(local)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// RTCP control channel over one non-blocking UDP socket bound to `dest`'s
/// peer (spec §6 "AudioControl"): whole compound datagrams in, whole
/// compound datagrams out, no packet framing involved at all.
pub struct UdpControlTransport {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpControlTransport {
    pub fn new(socket: UdpSocket, dest: SocketAddr) -> Self {
        Self { socket, dest }
    }
}

impl roc::ControlTransport for UdpControlTransport {
    fn send(&mut self, datagram: Bytes) -> Result<()> {
        self.socket.send_to(&datagram, self.dest)?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<Bytes>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((n, _peer)) => Ok(Some(Bytes::copy_from_slice(&buf[..n]))),
            Err(e) if would_block(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
