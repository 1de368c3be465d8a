//! Extended Report (RTCP packet type 207, RFC 3611, spec §4.12): a
//! container of typed report blocks. Standard `RRTR`/`DLRR` blocks carry
//! the RTT-computation fields; `MeasurementInfo`/`DelayMetrics`/
//! `QueueMetrics` are application-specific block types this toolkit defines
//! to carry the latency-metrics data model (spec §3 "Latency metrics") end
//! to end, since RFC 3611 has no standard block for them.

use crate::header::{Header, HEADER_LEN, PT_XR};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use roc_shared::error::{Error, Result};
use roc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

pub const BT_RRTR: u8 = 4;
pub const BT_DLRR: u8 = 5;
/// Application-specific: not an IANA-assigned RFC 3611 block type.
pub const BT_MEASUREMENT_INFO: u8 = 200;
pub const BT_DELAY_METRICS: u8 = 201;
pub const BT_QUEUE_METRICS: u8 = 202;

const BLOCK_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlrrSubblock {
    pub ssrc: u32,
    /// Middle 32 bits of the referenced RRTR's NTP timestamp.
    pub last_rr: u32,
    /// Delay since receiving that RRTR, in units of 1/65536 seconds.
    pub delay_since_last_rr: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrBlock {
    Rrtr { ntp_timestamp: u64 },
    Dlrr { subblocks: Vec<DlrrSubblock> },
    MeasurementInfo { ssrc: u32, sample_rate: u32 },
    DelayMetrics { ssrc: u32, niq_latency_ns: u64, e2e_latency_ns: u64, jitter_ns: u32 },
    QueueMetrics { ssrc: u32, niq_latency_ns: u64, niq_stalling_ns: u64 },
}

impl XrBlock {
    fn block_type(&self) -> u8 {
        match self {
            XrBlock::Rrtr { .. } => BT_RRTR,
            XrBlock::Dlrr { .. } => BT_DLRR,
            XrBlock::MeasurementInfo { .. } => BT_MEASUREMENT_INFO,
            XrBlock::DelayMetrics { .. } => BT_DELAY_METRICS,
            XrBlock::QueueMetrics { .. } => BT_QUEUE_METRICS,
        }
    }

    fn body_len(&self) -> usize {
        match self {
            XrBlock::Rrtr { .. } => 8,
            XrBlock::Dlrr { subblocks } => subblocks.len() * 12,
            XrBlock::MeasurementInfo { .. } => 8,
            XrBlock::DelayMetrics { .. } => 20,
            XrBlock::QueueMetrics { .. } => 20,
        }
    }

    fn encoded_len(&self) -> usize {
        BLOCK_HEADER_LEN + self.body_len()
    }

    fn write(&self, out: &mut BytesMut) {
        let body_len = self.body_len();
        out.put_u8(self.block_type());
        out.put_u8(0); // reserved / type-specific, unused by any block defined here
        out.put_u16((body_len / 4) as u16);
        match self {
            XrBlock::Rrtr { ntp_timestamp } => out.put_u64(*ntp_timestamp),
            XrBlock::Dlrr { subblocks } => {
                for sb in subblocks {
                    out.put_u32(sb.ssrc);
                    out.put_u32(sb.last_rr);
                    out.put_u32(sb.delay_since_last_rr);
                }
            }
            XrBlock::MeasurementInfo { ssrc, sample_rate } => {
                out.put_u32(*ssrc);
                out.put_u32(*sample_rate);
            }
            XrBlock::DelayMetrics {
                ssrc,
                niq_latency_ns,
                e2e_latency_ns,
                jitter_ns,
            } => {
                out.put_u32(*ssrc);
                out.put_u64(*niq_latency_ns);
                out.put_u64(*e2e_latency_ns);
                out.put_u32(*jitter_ns);
            }
            XrBlock::QueueMetrics {
                ssrc,
                niq_latency_ns,
                niq_stalling_ns,
            } => {
                out.put_u32(*ssrc);
                out.put_u64(*niq_latency_ns);
                out.put_u64(*niq_stalling_ns);
            }
        }
    }

    fn read<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < BLOCK_HEADER_LEN {
            return Err(Error::BadBuffer);
        }
        let block_type = buf.get_u8();
        let _reserved = buf.get_u8();
        let body_words = buf.get_u16() as usize;
        let body_len = body_words * 4;
        if buf.remaining() < body_len {
            return Err(Error::BadBuffer);
        }
        let mut body = buf.copy_to_bytes(body_len);
        let block = match block_type {
            BT_RRTR => {
                if body.remaining() < 8 {
                    return Err(Error::BadBuffer);
                }
                XrBlock::Rrtr {
                    ntp_timestamp: body.get_u64(),
                }
            }
            BT_DLRR => {
                let mut subblocks = Vec::new();
                while body.remaining() >= 12 {
                    subblocks.push(DlrrSubblock {
                        ssrc: body.get_u32(),
                        last_rr: body.get_u32(),
                        delay_since_last_rr: body.get_u32(),
                    });
                }
                XrBlock::Dlrr { subblocks }
            }
            BT_MEASUREMENT_INFO => {
                if body.remaining() < 8 {
                    return Err(Error::BadBuffer);
                }
                XrBlock::MeasurementInfo {
                    ssrc: body.get_u32(),
                    sample_rate: body.get_u32(),
                }
            }
            BT_DELAY_METRICS => {
                if body.remaining() < 20 {
                    return Err(Error::BadBuffer);
                }
                XrBlock::DelayMetrics {
                    ssrc: body.get_u32(),
                    niq_latency_ns: body.get_u64(),
                    e2e_latency_ns: body.get_u64(),
                    jitter_ns: body.get_u32(),
                }
            }
            BT_QUEUE_METRICS => {
                if body.remaining() < 20 {
                    return Err(Error::BadBuffer);
                }
                XrBlock::QueueMetrics {
                    ssrc: body.get_u32(),
                    niq_latency_ns: body.get_u64(),
                    niq_stalling_ns: body.get_u64(),
                }
            }
            _ => return Err(Error::BadBuffer),
        };
        Ok(block)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedReport {
    pub ssrc: u32,
    pub blocks: Vec<XrBlock>,
}

impl MarshalSize for ExtendedReport {
    fn marshal_size(&self) -> usize {
        HEADER_LEN + 4 + self.blocks.iter().map(XrBlock::encoded_len).sum::<usize>()
    }
}

impl Marshal for ExtendedReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let total = self.marshal_size();
        if buf.len() < total {
            return Err(Error::BadBuffer);
        }
        let header = Header::new(PT_XR, 0, total - HEADER_LEN);
        let mut out = BytesMut::with_capacity(total);
        crate::header::put_header(&mut out, &header);
        out.put_u32(self.ssrc);
        for block in &self.blocks {
            block.write(&mut out);
        }
        buf[..total].copy_from_slice(&out);
        Ok(total)
    }
}

impl Unmarshal for ExtendedReport {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self> {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PT_XR {
            return Err(Error::BadProtocol);
        }
        let body_len = header.length_words_minus_one as usize * 4;
        if buf.remaining() < body_len || body_len < 4 {
            return Err(Error::BadBuffer);
        }
        let mut body = buf.copy_to_bytes(body_len);
        let ssrc = body.get_u32();
        let mut blocks = Vec::new();
        while body.remaining() > 0 {
            blocks.push(XrBlock::read(&mut body)?);
        }
        Ok(Self { ssrc, blocks })
    }
}

pub fn parse(bytes: &Bytes) -> Result<ExtendedReport> {
    let mut cursor = bytes.clone();
    ExtendedReport::unmarshal(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_rrtr_and_dlrr() {
        let xr = ExtendedReport {
            ssrc: 1,
            blocks: vec![
                XrBlock::Rrtr { ntp_timestamp: 0xaabb_ccdd_eeff_0011 },
                XrBlock::Dlrr {
                    subblocks: vec![DlrrSubblock {
                        ssrc: 2,
                        last_rr: 100,
                        delay_since_last_rr: 200,
                    }],
                },
            ],
        };
        let bytes = xr.marshal().unwrap();
        assert_eq!(parse(&bytes).unwrap(), xr);
    }

    #[test]
    fn roundtrips_latency_metric_blocks() {
        let xr = ExtendedReport {
            ssrc: 9,
            blocks: vec![
                XrBlock::MeasurementInfo { ssrc: 9, sample_rate: 44100 },
                XrBlock::DelayMetrics {
                    ssrc: 9,
                    niq_latency_ns: 10_000_000,
                    e2e_latency_ns: 45_000_000,
                    jitter_ns: 500_000,
                },
                XrBlock::QueueMetrics {
                    ssrc: 9,
                    niq_latency_ns: 10_000_000,
                    niq_stalling_ns: 0,
                },
            ],
        };
        let bytes = xr.marshal().unwrap();
        assert_eq!(parse(&bytes).unwrap(), xr);
    }
}
