//! Reception report block (RFC 3550 §6.4.1), carried inside SR and RR
//! packets: one per remote source being received (spec §4.12).

use bytes::{Buf, BufMut, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

pub const BLOCK_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceptionReport {
    pub ssrc: u32,
    /// Fraction lost since the previous report, as an 8-bit fixed-point
    /// value in `[0, 256)` representing `[0.0, 1.0)`.
    pub fract_loss: u8,
    /// Cumulative number of packets lost, a signed 24-bit value.
    pub cum_loss: i32,
    pub ext_highest_seqnum: u32,
    pub jitter: u32,
    /// Middle 32 bits of the last SR's NTP timestamp.
    pub last_sr: u32,
    /// Delay since the last SR, in units of 1/65536 seconds.
    pub delay_since_last_sr: u32,
}

impl MarshalSize for ReceptionReport {
    fn marshal_size(&self) -> usize {
        BLOCK_LEN
    }
}

impl Marshal for ReceptionReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < BLOCK_LEN {
            return Err(Error::BadBuffer);
        }
        let mut out = BytesMut::with_capacity(BLOCK_LEN);
        out.put_u32(self.ssrc);
        let cum_loss_bytes = self.cum_loss.to_be_bytes();
        out.put_u8(self.fract_loss);
        out.put_slice(&cum_loss_bytes[1..4]);
        out.put_u32(self.ext_highest_seqnum);
        out.put_u32(self.jitter);
        out.put_u32(self.last_sr);
        out.put_u32(self.delay_since_last_sr);
        buf[..BLOCK_LEN].copy_from_slice(&out);
        Ok(BLOCK_LEN)
    }
}

impl Unmarshal for ReceptionReport {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < BLOCK_LEN {
            return Err(Error::BadBuffer);
        }
        let ssrc = buf.get_u32();
        let fract_loss = buf.get_u8();
        let mut cum_loss_bytes = [0u8; 4];
        buf.copy_to_slice(&mut cum_loss_bytes[1..4]);
        if cum_loss_bytes[1] & 0x80 != 0 {
            cum_loss_bytes[0] = 0xff; // sign-extend the 24-bit two's-complement value
        }
        let cum_loss = i32::from_be_bytes(cum_loss_bytes);
        let ext_highest_seqnum = buf.get_u32();
        let jitter = buf.get_u32();
        let last_sr = buf.get_u32();
        let delay_since_last_sr = buf.get_u32();
        Ok(Self {
            ssrc,
            fract_loss,
            cum_loss,
            ext_highest_seqnum,
            jitter,
            last_sr,
            delay_since_last_sr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn roundtrips_with_negative_cum_loss() {
        let report = ReceptionReport {
            ssrc: 0x1122_3344,
            fract_loss: 12,
            cum_loss: -5,
            ext_highest_seqnum: 1000,
            jitter: 42,
            last_sr: 0xdead_beef,
            delay_since_last_sr: 12345,
        };
        let bytes = report.marshal().unwrap();
        let mut cursor = Bytes::from(bytes);
        let decoded = ReceptionReport::unmarshal(&mut cursor).unwrap();
        assert_eq!(decoded, report);
    }
}
