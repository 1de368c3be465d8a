//! RTP header encode/decode (spec §6: RFC 3550 header, version=2, no
//! padding/extension by default).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

const RTP_VERSION: u8 = 2;
const HEADER_LEN: usize = 12;

/// A fully decoded RTP header plus its payload slice (spec §3 "RTP view").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    pub marker: bool,
    pub payload_type: u8,
    pub seqnum: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    pub fn new(payload_type: u8, ssrc: u32) -> Self {
        Self {
            marker: false,
            payload_type,
            seqnum: 0,
            timestamp: 0,
            ssrc,
        }
    }
}

impl MarshalSize for RtpHeader {
    fn marshal_size(&self) -> usize {
        HEADER_LEN
    }
}

impl Marshal for RtpHeader {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < HEADER_LEN {
            return Err(Error::BadBuffer);
        }
        let marker_bit = if self.marker { 1u8 << 7 } else { 0 };
        buf[0] = (RTP_VERSION << 6) | 0; // no padding, no extension, csrc count 0
        buf[1] = marker_bit | (self.payload_type & 0x7f);
        buf[2..4].copy_from_slice(&self.seqnum.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        Ok(HEADER_LEN)
    }
}

impl Unmarshal for RtpHeader {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < HEADER_LEN {
            return Err(Error::BadBuffer);
        }
        let first = buf.get_u8();
        let version = first >> 6;
        if version != RTP_VERSION {
            return Err(Error::BadProtocol);
        }
        let second = buf.get_u8();
        let marker = second & 0x80 != 0;
        let payload_type = second & 0x7f;
        let seqnum = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();
        Ok(Self {
            marker,
            payload_type,
            seqnum,
            timestamp,
            ssrc,
        })
    }
}

/// Splits a raw UDP datagram into a decoded header and the remaining
/// payload bytes.
pub fn parse(datagram: &Bytes) -> Result<(RtpHeader, Bytes)> {
    let mut cursor = datagram.clone();
    let header = RtpHeader::unmarshal(&mut cursor)?;
    Ok((header, cursor))
}

/// Serializes `header` followed by `payload` into one contiguous buffer.
pub fn compose(header: &RtpHeader, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(header.marshal_size() + payload.len());
    buf.resize(header.marshal_size(), 0);
    header.marshal_to(&mut buf)?;
    buf.put_slice(payload);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_wire_bytes() {
        let header = RtpHeader {
            marker: true,
            payload_type: 10,
            seqnum: 0xBEEF,
            timestamp: 0xCAFEBABE,
            ssrc: 0x1234_5678,
        };
        let datagram = compose(&header, &[1, 2, 3, 4]).unwrap();
        let (decoded, payload) = parse(&datagram).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(&payload[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = BytesMut::zeroed(HEADER_LEN);
        bytes[0] = 0x01 << 6; // version 1
        let mut cursor = bytes.freeze();
        assert_eq!(RtpHeader::unmarshal(&mut cursor), Err(Error::BadProtocol));
    }

    #[test]
    fn rejects_truncated_header() {
        let short = Bytes::from_static(&[0, 0, 0]);
        assert_eq!(parse(&short).unwrap_err(), Error::BadBuffer);
    }
}
