//! Goodbye (RTCP packet type 203, RFC 3550 §6.6, spec §4.12): announces
//! that one or more sources are leaving.

use crate::header::{Header, HEADER_LEN, PT_BYE};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goodbye {
    pub sources: Vec<u32>,
    pub reason: Option<String>,
}

impl MarshalSize for Goodbye {
    fn marshal_size(&self) -> usize {
        let reason_len = match &self.reason {
            Some(r) => {
                let raw = 1 + r.len();
                (raw + 3) / 4 * 4
            }
            None => 0,
        };
        HEADER_LEN + self.sources.len() * 4 + reason_len
    }
}

impl Marshal for Goodbye {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let total = self.marshal_size();
        if buf.len() < total {
            return Err(Error::BadBuffer);
        }
        let header = Header::new(PT_BYE, self.sources.len() as u8, total - HEADER_LEN);
        let mut out = BytesMut::with_capacity(total);
        crate::header::put_header(&mut out, &header);
        for ssrc in &self.sources {
            out.put_u32(*ssrc);
        }
        if let Some(reason) = &self.reason {
            let start = out.len();
            out.put_u8(reason.len() as u8);
            out.put_slice(reason.as_bytes());
            while (out.len() - start) % 4 != 0 {
                out.put_u8(0);
            }
        }
        buf[..total].copy_from_slice(&out);
        Ok(total)
    }
}

impl Unmarshal for Goodbye {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PT_BYE {
            return Err(Error::BadProtocol);
        }
        let body_len = header.length_words_minus_one as usize * 4;
        if buf.remaining() < body_len {
            return Err(Error::BadBuffer);
        }
        let mut body = buf.copy_to_bytes(body_len);
        let n_sources = header.count as usize;
        if body.remaining() < n_sources * 4 {
            return Err(Error::BadBuffer);
        }
        let sources: Vec<u32> = (0..n_sources).map(|_| body.get_u32()).collect();
        let reason = if body.remaining() > 0 {
            let len = body.get_u8() as usize;
            if body.remaining() < len {
                return Err(Error::BadBuffer);
            }
            let text_bytes = body.copy_to_bytes(len);
            Some(String::from_utf8_lossy(&text_bytes).into_owned())
        } else {
            None
        };
        Ok(Self { sources, reason })
    }
}

pub fn parse(bytes: &Bytes) -> Result<Goodbye> {
    let mut cursor = bytes.clone();
    Goodbye::unmarshal(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_with_reason() {
        let bye = Goodbye {
            sources: vec![1, 2, 3],
            reason: Some("teardown".to_string()),
        };
        let bytes = bye.marshal().unwrap();
        assert_eq!(parse(&bytes).unwrap(), bye);
    }

    #[test]
    fn roundtrips_without_reason() {
        let bye = Goodbye {
            sources: vec![5],
            reason: None,
        };
        let bytes = bye.marshal().unwrap();
        assert_eq!(parse(&bytes).unwrap(), bye);
    }
}
