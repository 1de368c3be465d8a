//! Receiver Report (RTCP packet type 201, RFC 3550 §6.4.2, spec §4.12): sent
//! by a participant that is not a data sender, or in addition to an SR.

use crate::header::{Header, HEADER_LEN, PT_RR};
use crate::reception_report::{ReceptionReport, BLOCK_LEN as REPORT_LEN};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverReport {
    pub ssrc: u32,
    pub reports: Vec<ReceptionReport>,
}

impl MarshalSize for ReceiverReport {
    fn marshal_size(&self) -> usize {
        HEADER_LEN + 4 + self.reports.len() * REPORT_LEN
    }
}

impl Marshal for ReceiverReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let total = self.marshal_size();
        if buf.len() < total {
            return Err(Error::BadBuffer);
        }
        let header = Header::new(PT_RR, self.reports.len() as u8, total - HEADER_LEN);
        let mut out = BytesMut::with_capacity(total);
        crate::header::put_header(&mut out, &header);
        out.put_u32(self.ssrc);
        for report in &self.reports {
            let mut report_buf = [0u8; REPORT_LEN];
            report.marshal_to(&mut report_buf)?;
            out.put_slice(&report_buf);
        }
        buf[..total].copy_from_slice(&out);
        Ok(total)
    }
}

impl Unmarshal for ReceiverReport {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PT_RR {
            return Err(Error::BadProtocol);
        }
        if buf.remaining() < 4 {
            return Err(Error::BadBuffer);
        }
        let ssrc = buf.get_u32();
        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(buf)?);
        }
        Ok(Self { ssrc, reports })
    }
}

pub fn parse(bytes: &Bytes) -> Result<ReceiverReport> {
    let mut cursor = bytes.clone();
    ReceiverReport::unmarshal(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reception_report::ReceptionReport;

    #[test]
    fn roundtrips() {
        let rr = ReceiverReport {
            ssrc: 7,
            reports: vec![ReceptionReport {
                ssrc: 9,
                fract_loss: 3,
                cum_loss: 2,
                ext_highest_seqnum: 500,
                jitter: 10,
                last_sr: 99,
                delay_since_last_sr: 200,
            }],
        };
        let bytes = rr.marshal().unwrap();
        assert_eq!(parse(&bytes).unwrap(), rr);
    }
}
