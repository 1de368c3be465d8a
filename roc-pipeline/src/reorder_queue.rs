//! Reorder queue and link meter (receiver, spec §4.5): a bounded buffer
//! keyed by extended sequence number, plus the RFC 3550 loss/jitter
//! observables computed in-line as packets pass through.

use std::collections::BTreeMap;

use roc_packet::{seq_lt, Packet, SeqExtender};
use roc_shared::error::Result;

pub struct ReorderQueueConfig {
    pub capacity_packets: usize,
}

/// A bounded priority queue over extended seqnum, with a fixed drop window
/// behind the read cursor (spec §4.5).
pub struct ReorderQueue {
    config: ReorderQueueConfig,
    extender: SeqExtender,
    packets: BTreeMap<u64, Packet>,
    read_cursor: Option<u64>,
    late_count: u64,
}

impl ReorderQueue {
    pub fn new(config: ReorderQueueConfig) -> Self {
        Self {
            config,
            extender: SeqExtender::new(),
            packets: BTreeMap::new(),
            read_cursor: None,
            late_count: 0,
        }
    }

    pub fn late_count(&self) -> u64 {
        self.late_count
    }

    /// Pushes one arriving packet, keyed by its RTP seqnum extended to a
    /// monotonic 64-bit counter. Drops (and counts as late) anything older
    /// than the read cursor by more than the configured window.
    pub fn push(&mut self, seqnum: u16, packet: Packet) {
        let ext = self.extender.extend(seqnum);
        if let Some(cursor) = self.read_cursor {
            if ext < cursor {
                self.late_count += 1;
                return;
            }
        }
        if self.packets.len() >= self.config.capacity_packets {
            if let Some((&oldest, _)) = self.packets.iter().next() {
                if ext > oldest {
                    self.packets.remove(&oldest);
                } else {
                    self.late_count += 1;
                    return;
                }
            }
        }
        self.packets.insert(ext, packet);
    }

    /// Pops the next packet in extended-seqnum order, advancing the read
    /// cursor past it. Returns `None` when the queue is empty, without
    /// advancing the cursor (the caller should treat this as "not yet
    /// arrived", not as a confirmed gap).
    pub fn pop_front(&mut self) -> Option<(u64, Packet)> {
        let next_key = *self.packets.keys().next()?;
        let packet = self.packets.remove(&next_key).unwrap();
        self.read_cursor = Some(next_key + 1);
        Some((next_key, packet))
    }

    pub fn peek_front_key(&self) -> Option<u64> {
        self.packets.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }
}

/// Tracks RFC 3550 §6.4.1 loss and jitter statistics for one source,
/// sitting in-line with the reorder queue as both an early writer and a
/// late reader (spec §4.5).
pub struct LinkMeter {
    first_ext_seq: Option<u64>,
    last_ext_seq: Option<u64>,
    received: u64,
    received_since_report: u64,
    expected_since_report_base: Option<u64>,
    jitter: f64,
    last_transit: Option<i64>,
}

impl LinkMeter {
    pub fn new() -> Self {
        Self {
            first_ext_seq: None,
            last_ext_seq: None,
            received: 0,
            received_since_report: 0,
            expected_since_report_base: None,
            jitter: 0.0,
            last_transit: None,
        }
    }

    pub fn on_packet_arrival(&mut self, ext_seq: u64, arrival_rtp_units: i64, rtp_timestamp: i64) {
        if self.first_ext_seq.is_none() {
            self.first_ext_seq = Some(ext_seq);
            self.expected_since_report_base = Some(ext_seq);
        }
        self.last_ext_seq = Some(self.last_ext_seq.map_or(ext_seq, |l| l.max(ext_seq)));
        self.received += 1;
        self.received_since_report += 1;

        let transit = arrival_rtp_units - rtp_timestamp;
        if let Some(last_transit) = self.last_transit {
            let d = (transit - last_transit).unsigned_abs() as f64;
            self.jitter += (d - self.jitter) / 16.0;
        }
        self.last_transit = Some(transit);
    }

    pub fn total_packets_expected(&self) -> u64 {
        match (self.first_ext_seq, self.last_ext_seq) {
            (Some(first), Some(last)) => last - first + 1,
            _ => 0,
        }
    }

    pub fn cum_lost(&self) -> i64 {
        self.total_packets_expected() as i64 - self.received as i64
    }

    /// Fractional loss since the previous call, resetting the interval
    /// counters (spec §4.5: "fract_loss over the interval since the
    /// previous report").
    pub fn fract_loss_since_last_report(&mut self) -> f32 {
        let expected_base = self.expected_since_report_base.unwrap_or(0);
        let expected = self.last_ext_seq.unwrap_or(expected_base).saturating_sub(expected_base) + 1;
        let lost = expected.saturating_sub(self.received_since_report);
        let fraction = if expected == 0 {
            0.0
        } else {
            lost as f32 / expected as f32
        };
        self.expected_since_report_base = self.last_ext_seq.map(|l| l + 1);
        self.received_since_report = 0;
        fraction.clamp(0.0, 1.0)
    }

    pub fn jitter_rtp_units(&self) -> u32 {
        self.jitter as u32
    }
}

impl Default for LinkMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Treats `a` as eligible to be dropped as a duplicate/late arrival versus
/// cursor `b`, for the 16-bit-wraparound-aware case the reorder queue hits
/// before seqnums have been extended.
pub fn is_late_16bit(seq: u16, cursor: u16) -> bool {
    seq_lt(seq, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use roc_packet::views::RtpView;

    fn packet(seq: u16) -> Packet {
        let p = Packet::empty();
        p.set_rtp(RtpView {
            payload_type: 11,
            ssrc: 1,
            seqnum: seq,
            timestamp: 0,
            marker: false,
            capture_timestamp: 0,
            payload: Bytes::new(),
        });
        p
    }

    #[test]
    fn pops_in_seqnum_order_despite_reordered_push() {
        let mut q = ReorderQueue::new(ReorderQueueConfig { capacity_packets: 16 });
        q.push(2, packet(2));
        q.push(0, packet(0));
        q.push(1, packet(1));
        let order: Vec<u64> = std::iter::from_fn(|| q.pop_front().map(|(k, _)| k)).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn drops_packets_older_than_read_cursor() {
        let mut q = ReorderQueue::new(ReorderQueueConfig { capacity_packets: 16 });
        q.push(0, packet(0));
        q.pop_front();
        q.push(0, packet(0)); // duplicate/late, cursor already past it
        assert!(q.is_empty());
        assert_eq!(q.late_count(), 1);
    }

    #[test]
    fn link_meter_tracks_loss_and_jitter() {
        let mut meter = LinkMeter::new();
        meter.on_packet_arrival(0, 1000, 1000);
        meter.on_packet_arrival(2, 3000, 3000); // gap at ext_seq 1
        assert_eq!(meter.total_packets_expected(), 3);
        assert_eq!(meter.cum_lost(), 1);
    }
}
