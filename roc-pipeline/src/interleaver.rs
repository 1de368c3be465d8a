//! Interleaver (sender, spec §4.3): shuffles each block's wire transmission
//! order to decorrelate bursty loss. Optional stage; packets are still
//! logically ordered by seqnum, only send order changes.

use roc_packet::{Packet, PacketSink};
use roc_shared::error::Result;

pub struct Interleaver<S: PacketSink> {
    sink: S,
    block_size: usize,
    permutation: Vec<usize>,
    buffer: Vec<Packet>,
}

impl<S: PacketSink> Interleaver<S> {
    /// Draws one permutation of `[0, block_size)` at construction and reuses
    /// it for every block (spec §4.3: "a precomputed permutation... drawn
    /// once at construction").
    pub fn new(sink: S, block_size: usize) -> Self {
        let mut permutation: Vec<usize> = (0..block_size).collect();
        // Fisher-Yates using a simple xorshift so this stage has no extra
        // dependency on a thread-local RNG for a one-time shuffle.
        let mut state: u64 = (block_size as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15).max(1);
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        for i in (1..permutation.len()).rev() {
            let j = (next() as usize) % (i + 1);
            permutation.swap(i, j);
        }
        Self {
            sink,
            block_size,
            permutation,
            buffer: Vec::with_capacity(block_size),
        }
    }

    fn flush(&mut self) -> Result<()> {
        let taken: Vec<Packet> = self.buffer.drain(..).collect();
        for &idx in &self.permutation {
            if let Some(packet) = taken.get(idx) {
                self.sink.write(packet.clone())?;
            }
        }
        Ok(())
    }
}

impl<S: PacketSink> PacketSink for Interleaver<S> {
    fn write(&mut self, packet: Packet) -> Result<()> {
        self.buffer.push(packet);
        if self.buffer.len() >= self.block_size {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use roc_packet::views::RtpView;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct VecSink(Arc<Mutex<Vec<Packet>>>);

    impl PacketSink for VecSink {
        fn write(&mut self, packet: Packet) -> Result<()> {
            self.0.lock().unwrap().push(packet);
            Ok(())
        }
    }

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
    fn emits_every_packet_exactly_once_per_block() {
        let sink = VecSink::default();
        let out = sink.0.clone();
        let mut il = Interleaver::new(sink, 6);
        for i in 0..6 {
            il.write(packet(i)).unwrap();
        }
        let mut seqs: Vec<u16> = out.lock().unwrap().iter().map(|p| p.rtp().unwrap().seqnum).collect();
        seqs.sort();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn permutation_is_stable_across_blocks() {
        let sink = VecSink::default();
        let out = sink.0.clone();
        let mut il = Interleaver::new(sink, 4);
        for i in 0..8 {
            il.write(packet(i)).unwrap();
        }
        let seqs: Vec<u16> = out.lock().unwrap().iter().map(|p| p.rtp().unwrap().seqnum).collect();
        let first_block_order: Vec<u16> = seqs[..4].to_vec();
        let second_block_order: Vec<u16> = seqs[4..].iter().map(|s| s - 4).collect();
        assert_eq!(first_block_order, second_block_order);
    }
}
