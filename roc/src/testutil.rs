//! In-process transport doubles for integration tests (spec §8): stand in
//! for the UDP sockets a real deployment would use, so the end-to-end
//! scenarios can run deterministically and synchronously in one thread.

use std::sync::{Arc, Mutex};

use roc_packet::{Packet, PacketSink};
use roc_shared::error::Result;

/// A deterministic loss pattern: `drop(i)` is consulted once per packet
/// index, in arrival order.
pub trait LossPattern: Send {
    fn drop(&mut self, index: u64) -> bool;
}

/// Never drops anything — the "lossless" scenario (spec §8 scenario 1).
pub struct NoLoss;
impl LossPattern for NoLoss {
    fn drop(&mut self, _index: u64) -> bool {
        false
    }
}

/// Drops every packet whose index modulo `period` falls in `[0, count)` —
/// a simple deterministic stand-in for "10% random loss" and "burst loss"
/// (spec §8 scenarios 2-3), without pulling in a full PRNG dependency for a
/// test double.
pub struct PeriodicLoss {
    period: u64,
    count: u64,
}

impl PeriodicLoss {
    pub fn new(period: u64, count: u64) -> Self {
        Self { period, count }
    }
}

impl LossPattern for PeriodicLoss {
    fn drop(&mut self, index: u64) -> bool {
        (index % self.period) < self.count
    }
}

/// Drops every packet with `start <= index < start + len` and nothing
/// else — a whole FEC block (or more) vanishing at once (spec §8 scenario
/// 3 "burst loss exceeding FEC capacity").
pub struct BurstLoss {
    start: u64,
    len: u64,
}

impl BurstLoss {
    pub fn new(start: u64, len: u64) -> Self {
        Self { start, len }
    }
}

impl LossPattern for BurstLoss {
    fn drop(&mut self, index: u64) -> bool {
        index >= self.start && index < self.start + self.len
    }
}

/// A [`PacketSink`] that forwards into a shared in-process queue, dropping
/// packets per a [`LossPattern`]. Sits between a `SenderSlot`'s router
/// output and a `ReceiverEndpointSet`'s `on_packet`, replacing the UDP
/// sockets a real deployment would use between them.
pub struct LossyLink {
    queue: Arc<Mutex<Vec<Packet>>>,
    pattern: Box<dyn LossPattern>,
    next_index: u64,
}

impl LossyLink {
    pub fn new(pattern: impl LossPattern + 'static) -> (Self, Arc<Mutex<Vec<Packet>>>) {
        let queue = Arc::new(Mutex::new(Vec::new()));
        (Self::with_queue(pattern, queue.clone()), queue)
    }

    /// Builds a link that feeds an existing queue, so a source endpoint and
    /// a repair endpoint (each with their own loss pattern and packet
    /// index) can land on the one queue a receiver drains from.
    pub fn with_queue(pattern: impl LossPattern + 'static, queue: Arc<Mutex<Vec<Packet>>>) -> Self {
        Self {
            queue,
            pattern: Box::new(pattern),
            next_index: 0,
        }
    }
}

impl PacketSink for LossyLink {
    fn write(&mut self, packet: Packet) -> Result<()> {
        let index = self.next_index;
        self.next_index += 1;
        if self.pattern.drop(index) {
            return Ok(());
        }
        self.queue.lock().unwrap().push(packet);
        Ok(())
    }
}

/// Drains every packet a [`LossyLink`] has accumulated so far, in arrival
/// order.
pub fn drain(queue: &Arc<Mutex<Vec<Packet>>>) -> Vec<Packet> {
    queue.lock().unwrap().drain(..).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use roc_packet::views::RtpView;

    fn packet(seqnum: u16) -> Packet {
        let p = Packet::empty();
        p.set_rtp(RtpView {
            payload_type: 11,
            ssrc: 1,
            seqnum,
            timestamp: 0,
            marker: false,
            capture_timestamp: 0,
            payload: Bytes::new(),
        });
        p
    }

    #[test]
    fn no_loss_forwards_everything() {
        let (mut link, queue) = LossyLink::new(NoLoss);
        for i in 0..10 {
            link.write(packet(i)).unwrap();
        }
        assert_eq!(drain(&queue).len(), 10);
    }

    #[test]
    fn periodic_loss_drops_the_configured_fraction() {
        let (mut link, queue) = LossyLink::new(PeriodicLoss::new(10, 1));
        for i in 0..20 {
            link.write(packet(i)).unwrap();
        }
        assert_eq!(drain(&queue).len(), 18);
    }
}
