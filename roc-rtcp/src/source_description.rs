//! Source Description (RTCP packet type 202, RFC 3550 §6.5, spec §4.12):
//! carries at least a CNAME item per chunk.

use crate::header::{Header, HEADER_LEN, PT_SDES};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

pub const SDES_CNAME: u8 = 1;
const SDES_END: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdesItem {
    pub item_type: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdesChunk {
    pub ssrc: u32,
    pub items: Vec<SdesItem>,
}

impl SdesChunk {
    pub fn with_cname(ssrc: u32, cname: &str) -> Self {
        Self {
            ssrc,
            items: vec![SdesItem {
                item_type: SDES_CNAME,
                text: cname.to_string(),
            }],
        }
    }

    fn encoded_len(&self) -> usize {
        let items_len: usize = self.items.iter().map(|i| 2 + i.text.len()).sum();
        let raw = 4 + items_len + 1; // ssrc + items + END marker
        (raw + 3) / 4 * 4 // pad to a 32-bit boundary
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescription {
    pub chunks: Vec<SdesChunk>,
}

impl MarshalSize for SourceDescription {
    fn marshal_size(&self) -> usize {
        HEADER_LEN + self.chunks.iter().map(|c| c.encoded_len()).sum::<usize>()
    }
}

impl Marshal for SourceDescription {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let total = self.marshal_size();
        if buf.len() < total {
            return Err(Error::BadBuffer);
        }
        let header = Header::new(PT_SDES, self.chunks.len() as u8, total - HEADER_LEN);
        let mut out = BytesMut::with_capacity(total);
        crate::header::put_header(&mut out, &header);
        for chunk in &self.chunks {
            let start = out.len();
            out.put_u32(chunk.ssrc);
            for item in &chunk.items {
                out.put_u8(item.item_type);
                out.put_u8(item.text.len() as u8);
                out.put_slice(item.text.as_bytes());
            }
            out.put_u8(SDES_END);
            while (out.len() - start) % 4 != 0 {
                out.put_u8(0);
            }
        }
        buf[..total].copy_from_slice(&out);
        Ok(total)
    }
}

impl Unmarshal for SourceDescription {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PT_SDES {
            return Err(Error::BadProtocol);
        }
        let body_len = header.length_words_minus_one as usize * 4;
        if buf.remaining() < body_len {
            return Err(Error::BadBuffer);
        }
        let mut body = buf.copy_to_bytes(body_len);
        let mut chunks = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            if body.remaining() < 4 {
                return Err(Error::BadBuffer);
            }
            let start_remaining = body.remaining();
            let ssrc = body.get_u32();
            let mut items = Vec::new();
            loop {
                if body.remaining() == 0 {
                    return Err(Error::BadBuffer);
                }
                let item_type = body.get_u8();
                if item_type == SDES_END {
                    break;
                }
                if body.remaining() == 0 {
                    return Err(Error::BadBuffer);
                }
                let len = body.get_u8() as usize;
                if body.remaining() < len {
                    return Err(Error::BadBuffer);
                }
                let text_bytes = body.copy_to_bytes(len);
                let text = String::from_utf8_lossy(&text_bytes).into_owned();
                items.push(SdesItem { item_type, text });
            }
            let consumed = start_remaining - body.remaining();
            let pad = (4 - consumed % 4) % 4;
            if body.remaining() < pad {
                return Err(Error::BadBuffer);
            }
            body.advance(pad);
            chunks.push(SdesChunk { ssrc, items });
        }
        Ok(Self { chunks })
    }
}

pub fn parse(bytes: &Bytes) -> Result<SourceDescription> {
    let mut cursor = bytes.clone();
    SourceDescription::unmarshal(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_single_cname_chunk() {
        let sdes = SourceDescription {
            chunks: vec![SdesChunk::with_cname(42, "alice@example.org")],
        };
        let bytes = sdes.marshal().unwrap();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(parse(&bytes).unwrap(), sdes);
    }

    #[test]
    fn roundtrips_multiple_chunks() {
        let sdes = SourceDescription {
            chunks: vec![
                SdesChunk::with_cname(1, "a"),
                SdesChunk::with_cname(2, "bb"),
            ],
        };
        let bytes = sdes.marshal().unwrap();
        assert_eq!(parse(&bytes).unwrap(), sdes);
    }
}
