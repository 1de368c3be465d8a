//! Sender Report (RTCP packet type 200, RFC 3550 §6.4.1, spec §4.12): sent
//! by a data sender, carrying its own send statistics plus zero or more
//! reception reports for sources it also receives.

use crate::header::{Header, HEADER_LEN, PT_SR};
use crate::reception_report::{ReceptionReport, BLOCK_LEN as REPORT_LEN};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

const SENDER_INFO_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    pub ntp_timestamp: u64,
    pub rtp_timestamp: u32,
    pub packet_count: u32,
    pub octet_count: u32,
    pub reports: Vec<ReceptionReport>,
}

impl MarshalSize for SenderReport {
    fn marshal_size(&self) -> usize {
        HEADER_LEN + 4 + SENDER_INFO_LEN + self.reports.len() * REPORT_LEN
    }
}

impl Marshal for SenderReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let total = self.marshal_size();
        if buf.len() < total {
            return Err(Error::BadBuffer);
        }
        let header = Header::new(PT_SR, self.reports.len() as u8, total - HEADER_LEN);
        let mut out = BytesMut::with_capacity(total);
        crate::header::put_header(&mut out, &header);
        out.put_u32(self.ssrc);
        out.put_u64(self.ntp_timestamp);
        out.put_u32(self.rtp_timestamp);
        out.put_u32(self.packet_count);
        out.put_u32(self.octet_count);
        for report in &self.reports {
            let mut report_buf = [0u8; REPORT_LEN];
            report.marshal_to(&mut report_buf)?;
            out.put_slice(&report_buf);
        }
        buf[..total].copy_from_slice(&out);
        Ok(total)
    }
}

impl Unmarshal for SenderReport {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PT_SR {
            return Err(Error::BadProtocol);
        }
        if buf.remaining() < SENDER_INFO_LEN {
            return Err(Error::BadBuffer);
        }
        let ssrc = buf.get_u32();
        let ntp_timestamp = buf.get_u64();
        let rtp_timestamp = buf.get_u32();
        let packet_count = buf.get_u32();
        let octet_count = buf.get_u32();
        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(buf)?);
        }
        Ok(Self {
            ssrc,
            ntp_timestamp,
            rtp_timestamp,
            packet_count,
            octet_count,
            reports,
        })
    }
}

pub fn parse(bytes: &Bytes) -> Result<SenderReport> {
    let mut cursor = bytes.clone();
    SenderReport::unmarshal(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_with_no_reports() {
        let sr = SenderReport {
            ssrc: 1,
            ntp_timestamp: 0x1122_3344_5566_7788,
            rtp_timestamp: 9000,
            packet_count: 100,
            octet_count: 44100,
            reports: vec![],
        };
        let bytes = sr.marshal().unwrap();
        assert_eq!(parse(&bytes).unwrap(), sr);
    }

    #[test]
    fn roundtrips_with_reports() {
        let sr = SenderReport {
            ssrc: 1,
            ntp_timestamp: 42,
            rtp_timestamp: 9000,
            packet_count: 100,
            octet_count: 44100,
            reports: vec![crate::reception_report::ReceptionReport {
                ssrc: 2,
                fract_loss: 0,
                cum_loss: 0,
                ext_highest_seqnum: 5,
                jitter: 0,
                last_sr: 0,
                delay_since_last_sr: 0,
            }],
        };
        let bytes = sr.marshal().unwrap();
        let decoded = parse(&bytes).unwrap();
        assert_eq!(decoded, sr);
    }
}
