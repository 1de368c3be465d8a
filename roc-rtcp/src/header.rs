//! RTCP common header (RFC 3550 §6.1, spec §6): every packet in a compound
//! starts with one of these.

use bytes::{Buf, BufMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

pub const VERSION: u8 = 2;
pub const HEADER_LEN: usize = 4;

pub const PT_SR: u8 = 200;
pub const PT_RR: u8 = 201;
pub const PT_SDES: u8 = 202;
pub const PT_BYE: u8 = 203;
pub const PT_XR: u8 = 207;

/// The 4-byte header shared by every RTCP packet: version/padding/count,
/// packet type, and a length in 32-bit words minus one (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub padding: bool,
    /// Reception-report count (SR/RR), source count (SDES/BYE), or the
    /// XR-specific "reserved" field — 5 bits.
    pub count: u8,
    pub packet_type: u8,
    /// Length of the packet in 32-bit words, minus one, not including this
    /// header word itself.
    pub length_words_minus_one: u16,
}

impl Header {
    pub fn new(packet_type: u8, count: u8, body_len_bytes: usize) -> Self {
        debug_assert_eq!(body_len_bytes % 4, 0, "rtcp bodies are word-aligned");
        Self {
            padding: false,
            count,
            packet_type,
            length_words_minus_one: (body_len_bytes / 4) as u16,
        }
    }

    /// Total size on the wire, header included.
    pub fn total_len_bytes(&self) -> usize {
        HEADER_LEN + self.length_words_minus_one as usize * 4
    }
}

impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        HEADER_LEN
    }
}

impl Marshal for Header {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < HEADER_LEN {
            return Err(Error::BadBuffer);
        }
        let padding_bit = if self.padding { 1u8 << 5 } else { 0 };
        buf[0] = (VERSION << 6) | padding_bit | (self.count & 0x1f);
        buf[1] = self.packet_type;
        buf[2..4].copy_from_slice(&self.length_words_minus_one.to_be_bytes());
        Ok(HEADER_LEN)
    }
}

impl Unmarshal for Header {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < HEADER_LEN {
            return Err(Error::BadBuffer);
        }
        let first = buf.get_u8();
        let version = first >> 6;
        if version != VERSION {
            return Err(Error::BadProtocol);
        }
        let padding = first & 0x20 != 0;
        let count = first & 0x1f;
        let packet_type = buf.get_u8();
        let length_words_minus_one = buf.get_u16();
        Ok(Self {
            padding,
            count,
            packet_type,
            length_words_minus_one,
        })
    }
}

pub(crate) fn put_header(buf: &mut bytes::BytesMut, header: &Header) {
    let padding_bit = if header.padding { 1u8 << 5 } else { 0 };
    buf.put_u8((VERSION << 6) | padding_bit | (header.count & 0x1f));
    buf.put_u8(header.packet_type);
    buf.put_u16(header.length_words_minus_one);
}
