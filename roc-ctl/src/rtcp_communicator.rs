//! Builds and parses the periodic compound RTCP packets that carry the
//! feedback loop between sender and receiver (spec §4.9, §4.12).

use std::collections::HashMap;
use std::time::Duration;

use roc_rtcp::{
    compose, parse, DlrrSubblock, ExtendedReport, Goodbye, ReceiverReport, ReceptionReport,
    RtcpPacket, SdesChunk, SenderReport, SourceDescription, XrBlock,
};
use roc_shared::error::Result;
use roc_shared::sync::rate_limiter::RateLimiter;
use roc_shared::time::{Nanos, SystemInstant};

use crate::feedback_monitor::{FeedbackMonitor, LatencyMetrics, LinkMetrics};

const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(1000);

/// Middle 32 bits of a 64-bit NTP timestamp: the compact form SR/DLRR carry.
fn ntp_middle_32(ntp: u64) -> u32 {
    ((ntp >> 16) & 0xFFFF_FFFF) as u32
}

#[derive(Debug, Clone, Copy, Default)]
struct RemoteSr {
    ntp_middle: u32,
    received_at_ntp: u64,
}

/// A remote XR RRTR this side has heard, kept so the next outbound report
/// can mirror it back in a DLRR (spec §4.9 "RTT computation").
#[derive(Debug, Clone, Copy, Default)]
struct RemoteRrtr {
    ntp_middle: u32,
    received_at_ntp: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ParticipantState {
    ext_highest_seqnum: u32,
    fract_loss: u8,
    cum_loss: i32,
    jitter: u32,
    last_sr: RemoteSr,
    last_rrtr: Option<RemoteRrtr>,
    rtt: Option<Nanos>,
}

pub struct RtcpCommunicator {
    local_ssrc: u32,
    cname: String,
    clock: SystemInstant,
    limiter: RateLimiter,
    participants: HashMap<u32, ParticipantState>,
}

impl RtcpCommunicator {
    pub fn new(local_ssrc: u32, cname: impl Into<String>) -> Self {
        Self {
            local_ssrc,
            cname: cname.into(),
            clock: SystemInstant::now(),
            limiter: RateLimiter::new(DEFAULT_REPORT_INTERVAL),
            participants: HashMap::new(),
        }
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.limiter = RateLimiter::new(interval);
        self
    }

    /// Returns `true` once the rate limiter (driven externally with jitter
    /// by the caller staggering its tick) permits building a new report.
    pub fn should_report(&self) -> bool {
        self.limiter.would_allow()
    }

    /// Builds a sender-side compound packet: SR with per-source reception
    /// reports, SDES, and — once this side has heard a receiver's XR RRTR —
    /// an XR DLRR mirroring it back, so the receiver can compute its own
    /// RTT to this sender (spec §4.9 "RTT computation", symmetric with
    /// `build_receiver_report`'s own DLRR-for-SR).
    pub fn build_sender_report(
        &mut self,
        now: std::time::Instant,
        rtp_timestamp: u32,
        packet_count: u32,
        octet_count: u32,
    ) -> Result<bytes::Bytes> {
        self.limiter.allow();
        let reports = self
            .participants
            .iter()
            .map(|(&ssrc, state)| ReceptionReport {
                ssrc,
                fract_loss: state.fract_loss,
                cum_loss: state.cum_loss,
                ext_highest_seqnum: state.ext_highest_seqnum,
                jitter: state.jitter,
                last_sr: state.last_sr.ntp_middle,
                delay_since_last_sr: 0,
            })
            .collect();
        let sr = SenderReport {
            ssrc: self.local_ssrc,
            ntp_timestamp: self.clock.ntp(now),
            rtp_timestamp,
            packet_count,
            octet_count,
            reports,
        };
        let sdes = SourceDescription {
            chunks: vec![SdesChunk::with_cname(self.local_ssrc, &self.cname)],
        };

        let now_middle = ntp_middle_32(self.clock.ntp(now));
        let dlrr: Vec<DlrrSubblock> = self
            .participants
            .iter()
            .filter_map(|(&ssrc, state)| {
                state.last_rrtr.map(|rrtr| DlrrSubblock {
                    ssrc,
                    last_rr: rrtr.ntp_middle,
                    delay_since_last_rr: now_middle.wrapping_sub(ntp_middle_32(rrtr.received_at_ntp)),
                })
            })
            .collect();

        let mut packets = vec![RtcpPacket::SenderReport(sr), RtcpPacket::SourceDescription(sdes)];
        if !dlrr.is_empty() {
            packets.push(RtcpPacket::ExtendedReport(ExtendedReport {
                ssrc: self.local_ssrc,
                blocks: vec![XrBlock::Dlrr { subblocks: dlrr }],
            }));
        }
        compose(&packets)
    }

    /// Builds a receiver-side compound packet: RR with per-source reception
    /// reports, XR RRTR (so the sender can compute RTT), and XR DLRR
    /// mirroring every sender this receiver has heard an SR from.
    pub fn build_receiver_report(
        &mut self,
        now: std::time::Instant,
        latency: LatencyMetrics,
    ) -> Result<bytes::Bytes> {
        self.limiter.allow();
        let reports: Vec<ReceptionReport> = self
            .participants
            .iter()
            .map(|(&ssrc, state)| ReceptionReport {
                ssrc,
                fract_loss: (latency.fract_loss.clamp(0.0, 1.0) * 255.0) as u8,
                cum_loss: latency.cum_loss.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                ext_highest_seqnum: state.ext_highest_seqnum,
                jitter: latency.jitter as u32,
                last_sr: state.last_sr.ntp_middle,
                delay_since_last_sr: 0,
            })
            .collect();
        let rr = ReceiverReport {
            ssrc: self.local_ssrc,
            reports,
        };

        let mut blocks = vec![XrBlock::Rrtr {
            ntp_timestamp: self.clock.ntp(now),
        }];
        let dlrr: Vec<DlrrSubblock> = self
            .participants
            .iter()
            .filter(|(_, state)| state.last_sr.ntp_middle != 0)
            .map(|(&ssrc, state)| DlrrSubblock {
                ssrc,
                last_rr: state.last_sr.ntp_middle,
                delay_since_last_rr: 0,
            })
            .collect();
        if !dlrr.is_empty() {
            blocks.push(XrBlock::Dlrr { subblocks: dlrr });
        }
        let xr = ExtendedReport {
            ssrc: self.local_ssrc,
            blocks,
        };

        compose(&[RtcpPacket::ReceiverReport(rr), RtcpPacket::ExtendedReport(xr)])
    }

    pub fn build_goodbye(&self, reason: Option<String>) -> Result<bytes::Bytes> {
        compose(&[RtcpPacket::Goodbye(Goodbye {
            sources: vec![self.local_ssrc],
            reason,
        })])
    }

    /// Parses an inbound compound datagram, updates the per-participant
    /// table, and forwards sender-observed feedback to `monitor` (spec
    /// §4.9, §4.12: "the communicator updates the per-participant table and
    /// calls `process_feedback`").
    pub fn handle_inbound(
        &mut self,
        now_ns: Nanos,
        datagram: &bytes::Bytes,
        monitor: Option<&mut FeedbackMonitor>,
    ) -> Result<()> {
        let packets = parse(datagram)?;
        let mut monitor = monitor;
        for packet in packets {
            match packet {
                RtcpPacket::SenderReport(sr) => {
                    let entry = self.participants.entry(sr.ssrc).or_default();
                    entry.last_sr = RemoteSr {
                        ntp_middle: ntp_middle_32(sr.ntp_timestamp),
                        received_at_ntp: sr.ntp_timestamp,
                    };
                    for rr in &sr.reports {
                        if rr.ssrc != self.local_ssrc {
                            continue;
                        }
                        if let Some(m) = monitor.as_deref_mut() {
                            let latency = LatencyMetrics {
                                niq_latency: 0,
                                niq_stalling: 0,
                                e2e_latency: 0,
                                jitter: rr.jitter as u64,
                                fract_loss: rr.fract_loss as f32 / 255.0,
                                cum_loss: rr.cum_loss as i64,
                            };
                            m.process_feedback(now_ns, sr.ssrc, latency, LinkMetrics { rtt: None });
                        }
                    }
                }
                RtcpPacket::ReceiverReport(rr) => {
                    // Ensure the reporter itself (`rr.ssrc`) has a table entry,
                    // since that's the key a later XR DLRR from the same
                    // reporter is looked up under.
                    self.participants.entry(rr.ssrc).or_default();
                    for report in &rr.reports {
                        let entry = self.participants.entry(report.ssrc).or_default();
                        entry.ext_highest_seqnum = report.ext_highest_seqnum;
                        entry.fract_loss = report.fract_loss;
                        entry.cum_loss = report.cum_loss;
                        entry.jitter = report.jitter;
                    }
                }
                RtcpPacket::ExtendedReport(xr) => {
                    self.participants.entry(xr.ssrc).or_default();
                    for block in xr.blocks {
                        match block {
                            XrBlock::Dlrr { subblocks } => {
                                for sub in subblocks {
                                    if sub.ssrc != self.local_ssrc {
                                        continue;
                                    }
                                    if let Some(entry) = self.participants.get_mut(&xr.ssrc) {
                                        entry.rtt = compute_rtt(
                                            ntp_middle_32(self.clock.ntp(std::time::Instant::now())),
                                            sub.last_rr,
                                            sub.delay_since_last_rr,
                                        );
                                    }
                                }
                            }
                            XrBlock::Rrtr { ntp_timestamp } => {
                                let entry = self.participants.entry(xr.ssrc).or_default();
                                entry.last_rrtr = Some(RemoteRrtr {
                                    ntp_middle: ntp_middle_32(ntp_timestamp),
                                    received_at_ntp: self.clock.ntp(std::time::Instant::now()),
                                });
                            }
                            _ => {}
                        }
                    }
                }
                RtcpPacket::SourceDescription(_) | RtcpPacket::Goodbye(_) => {}
            }
        }
        Ok(())
    }

    pub fn rtt_for(&self, ssrc: u32) -> Option<Nanos> {
        self.participants.get(&ssrc).and_then(|p| p.rtt)
    }

    /// The most recently computed RTT to any participant, for a single-peer
    /// deployment where there's exactly one remote ssrc worth asking about.
    pub fn any_rtt(&self) -> Option<Nanos> {
        self.participants.values().find_map(|p| p.rtt)
    }
}

/// `rtt = now - last_report - delay_since_last_report`, all in NTP middle-32
/// units (1/65536 s), converted to nanoseconds (spec §4.9: "RTT computation
/// via the T_rr - T_sr - delay_since_last_SR formula").
fn compute_rtt(now_middle: u32, last_report_middle: u32, delay_middle: u32) -> Option<Nanos> {
    if last_report_middle == 0 {
        return None;
    }
    let round_trip = now_middle
        .wrapping_sub(last_report_middle)
        .wrapping_sub(delay_middle);
    Some((round_trip as u64 * 1_000_000_000) / 65536)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_report_roundtrips_through_communicator() {
        let mut sender = RtcpCommunicator::new(1, "sender@host");
        let mut receiver = RtcpCommunicator::new(2, "receiver@host");
        let datagram = sender
            .build_sender_report(std::time::Instant::now(), 9000, 10, 4410)
            .unwrap();
        receiver.handle_inbound(0, &datagram, None).unwrap();
        assert!(receiver.participants.contains_key(&1));
    }

    #[test]
    fn rtt_is_none_without_prior_sr() {
        assert_eq!(compute_rtt(100, 0, 5), None);
    }

    #[test]
    fn rtt_computation_is_sane_for_small_delay() {
        let rtt = compute_rtt(1_000_100, 1_000_000, 50).unwrap();
        assert!(rtt > 0);
        assert!(rtt < 100_000_000);
    }
}
