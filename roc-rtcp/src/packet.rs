//! A compound RTCP packet: a back-to-back sequence of individual RTCP
//! packets sharing one datagram (RFC 3550 §6.1, spec §4.12).

use crate::goodbye::Goodbye;
use crate::header::{Header, PT_BYE, PT_RR, PT_SDES, PT_SR, PT_XR};
use crate::receiver_report::ReceiverReport;
use crate::sender_report::SenderReport;
use crate::source_description::SourceDescription;
use crate::xr::ExtendedReport;
use bytes::{Bytes, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpPacket {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    SourceDescription(SourceDescription),
    Goodbye(Goodbye),
    ExtendedReport(ExtendedReport),
}

impl RtcpPacket {
    fn marshal_size(&self) -> usize {
        match self {
            RtcpPacket::SenderReport(p) => p.marshal_size(),
            RtcpPacket::ReceiverReport(p) => p.marshal_size(),
            RtcpPacket::SourceDescription(p) => p.marshal_size(),
            RtcpPacket::Goodbye(p) => p.marshal_size(),
            RtcpPacket::ExtendedReport(p) => p.marshal_size(),
        }
    }

    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            RtcpPacket::SenderReport(p) => p.marshal_to(buf),
            RtcpPacket::ReceiverReport(p) => p.marshal_to(buf),
            RtcpPacket::SourceDescription(p) => p.marshal_to(buf),
            RtcpPacket::Goodbye(p) => p.marshal_to(buf),
            RtcpPacket::ExtendedReport(p) => p.marshal_to(buf),
        }
    }
}

/// Serializes a sequence of packets back-to-back into one compound buffer
/// (spec §4.12: "builds a compound RTCP packet containing...").
pub fn compose(packets: &[RtcpPacket]) -> Result<Bytes> {
    let total: usize = packets.iter().map(RtcpPacket::marshal_size).sum();
    let mut out = BytesMut::zeroed(total);
    let mut offset = 0;
    for packet in packets {
        let n = packet.marshal_to(&mut out[offset..])?;
        offset += n;
    }
    Ok(out.freeze())
}

/// Splits a compound datagram into its constituent packets, peeking each
/// packet's common header to dispatch to the right parser and to find the
/// next packet's start.
pub fn parse(datagram: &Bytes) -> Result<Vec<RtcpPacket>> {
    let mut packets = Vec::new();
    let mut remaining = datagram.clone();
    while !remaining.is_empty() {
        let mut peek = remaining.clone();
        let header = Header::unmarshal(&mut peek)?;
        let total_len = header.total_len_bytes();
        if remaining.len() < total_len {
            return Err(Error::BadBuffer);
        }
        let this_packet = remaining.split_to(total_len);
        let packet = match header.packet_type {
            PT_SR => RtcpPacket::SenderReport(SenderReport::unmarshal(&mut this_packet.clone())?),
            PT_RR => RtcpPacket::ReceiverReport(ReceiverReport::unmarshal(&mut this_packet.clone())?),
            PT_SDES => RtcpPacket::SourceDescription(SourceDescription::unmarshal(&mut this_packet.clone())?),
            PT_BYE => RtcpPacket::Goodbye(Goodbye::unmarshal(&mut this_packet.clone())?),
            PT_XR => RtcpPacket::ExtendedReport(ExtendedReport::unmarshal(&mut this_packet.clone())?),
            _ => return Err(Error::BadProtocol),
        };
        packets.push(packet);
    }
    Ok(packets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reception_report::ReceptionReport;
    use crate::source_description::SdesChunk;

    #[test]
    fn compound_roundtrips_sr_sdes_bye() {
        let packets = vec![
            RtcpPacket::SenderReport(SenderReport {
                ssrc: 1,
                ntp_timestamp: 42,
                rtp_timestamp: 9000,
                packet_count: 10,
                octet_count: 4410,
                reports: vec![ReceptionReport {
                    ssrc: 2,
                    fract_loss: 0,
                    cum_loss: 0,
                    ext_highest_seqnum: 10,
                    jitter: 0,
                    last_sr: 0,
                    delay_since_last_sr: 0,
                }],
            }),
            RtcpPacket::SourceDescription(SourceDescription {
                chunks: vec![SdesChunk::with_cname(1, "sender@host")],
            }),
            RtcpPacket::Goodbye(Goodbye {
                sources: vec![1],
                reason: None,
            }),
        ];
        let datagram = compose(&packets).unwrap();
        let parsed = parse(&datagram).unwrap();
        assert_eq!(parsed, packets);
    }
}
