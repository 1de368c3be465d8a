//! `PacketParser`/`PacketComposer` adapters wiring the RTP header codec to
//! `roc_packet::Packet` (spec §3 "a packet is created by a parser on
//! receive, or a composer on send").

use std::net::SocketAddr;

use bytes::Bytes;
use roc_packet::{views::RtpView, Packet, PacketComposer, PacketParser};
use roc_shared::error::Result;
use roc_shared::time::Nanos;

use crate::header::{compose, parse, RtpHeader};

pub struct RtpCodec;

impl PacketParser for RtpCodec {
    fn parse(&self, data: Bytes, source: SocketAddr, destination: SocketAddr) -> Result<Packet> {
        let (header, payload) = parse(&data)?;
        let packet = Packet::from_bytes(data);
        packet.set_udp(roc_packet::views::UdpView { source, destination });
        packet.set_rtp(RtpView {
            payload_type: header.payload_type,
            ssrc: header.ssrc,
            seqnum: header.seqnum,
            timestamp: header.timestamp,
            marker: header.marker,
            capture_timestamp: 0,
            payload,
        });
        Ok(packet)
    }
}

impl PacketComposer for RtpCodec {
    fn compose(&self, packet: &Packet) -> Result<Bytes> {
        let view = packet
            .rtp()
            .ok_or(roc_shared::error::Error::BadOperation)?;
        let header = RtpHeader {
            marker: view.marker,
            payload_type: view.payload_type,
            seqnum: view.seqnum,
            timestamp: view.timestamp,
            ssrc: view.ssrc,
        };
        let bytes = compose(&header, &view.payload)?;
        packet.set_flags(roc_packet::PacketFlags::COMPOSED);
        Ok(bytes)
    }
}

/// Builds an RTP-view-only packet that hasn't been composed to wire bytes
/// yet (spec §3: a composer fills in addressing before serialization).
pub fn prepare(view: RtpView, capture_timestamp: Nanos) -> Packet {
    let packet = Packet::empty();
    packet.set_rtp(RtpView {
        capture_timestamp,
        ..view
    });
    packet.set_flags(roc_packet::PacketFlags::PREPARED);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_a_prepared_packet_to_wire_bytes() {
        let packet = prepare(
            RtpView {
                payload_type: 10,
                ssrc: 1,
                seqnum: 5,
                timestamp: 100,
                marker: false,
                capture_timestamp: 0,
                payload: Bytes::from_static(&[1, 2, 3, 4]),
            },
            0,
        );
        let bytes = RtpCodec.compose(&packet).unwrap();
        let (header, payload) = parse(&bytes).unwrap();
        assert_eq!(header.seqnum, 5);
        assert_eq!(&payload[..], &[1, 2, 3, 4]);
    }
}
