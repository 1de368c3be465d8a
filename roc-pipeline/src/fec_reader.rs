//! FEC reader (receiver, spec §4.6): tracks in-flight blocks, reconstructs
//! missing source packets once a block becomes decodable, and abandons
//! blocks the read cursor has moved past.

use std::collections::BTreeMap;

use bytes::Bytes;
use roc_fec::decode;
use roc_packet::views::{FecScheme, RtpView};
use roc_packet::{Packet, PacketFlags};
use roc_shared::error::Result;

struct Anchor {
    seqnum: u16,
    timestamp: u32,
    esi: u16,
    ssrc: u32,
    payload_type: u8,
}

struct BlockState {
    scheme: FecScheme,
    source_block_length: u16,
    block_length: u16,
    shards: Vec<Option<Vec<u8>>>, // index 0..source_block_length = source, rest = repair
    anchor: Option<Anchor>,
    decoded: bool,
}

impl BlockState {
    fn new(scheme: FecScheme, source_block_length: u16, block_length: u16) -> Self {
        Self {
            scheme,
            source_block_length,
            block_length,
            shards: vec![None; block_length as usize],
            anchor: None,
            decoded: false,
        }
    }

    fn present_count(&self) -> usize {
        self.shards.iter().filter(|s| s.is_some()).count()
    }
}

pub struct FecReader {
    samples_per_packet: u32,
    capacity_blocks: usize,
    blocks: BTreeMap<u16, BlockState>,
    cursor_sbn: Option<u16>,
}

impl FecReader {
    pub fn new(samples_per_packet: u32, capacity_blocks: usize) -> Self {
        Self {
            samples_per_packet,
            capacity_blocks,
            blocks: BTreeMap::new(),
            cursor_sbn: None,
        }
    }

    /// Feeds one arrived source packet (not yet known to be missing).
    pub fn push_source(&mut self, packet: &Packet) -> Result<()> {
        let fec = packet.fec().ok_or(roc_shared::error::Error::BadProtocol)?;
        let rtp = packet.rtp().ok_or(roc_shared::error::Error::BadProtocol)?;
        let block = self.block_mut(fec.scheme, fec.source_block_number, fec.source_block_length, fec.block_length);
        let esi = fec.encoding_symbol_id as usize;
        if esi < block.shards.len() {
            block.shards[esi] = Some(rtp.payload.to_vec());
        }
        if block.anchor.is_none() {
            block.anchor = Some(Anchor {
                seqnum: rtp.seqnum,
                timestamp: rtp.timestamp,
                esi: fec.encoding_symbol_id,
                ssrc: rtp.ssrc,
                payload_type: rtp.payload_type,
            });
        }
        Ok(())
    }

    /// Feeds one arrived repair packet.
    pub fn push_repair(&mut self, packet: &Packet) -> Result<()> {
        let fec = packet.fec().ok_or(roc_shared::error::Error::BadProtocol)?;
        let block = self.block_mut(fec.scheme, fec.source_block_number, fec.source_block_length, fec.block_length);
        let idx = block.source_block_length as usize + fec.encoding_symbol_id as usize;
        if idx < block.shards.len() {
            block.shards[idx] = Some(fec.payload.to_vec());
        }
        Ok(())
    }

    fn block_mut(&mut self, scheme: FecScheme, sbn: u16, n: u16, block_length: u16) -> &mut BlockState {
        self.blocks
            .entry(sbn)
            .or_insert_with(|| BlockState::new(scheme, n, block_length))
    }

    /// Attempts to decode every block that has become decodable (≥ N
    /// symbols present), ascending by `source_block_number`, returning the
    /// reconstructed source packets it didn't already have (spec §4.6).
    pub fn drain_decodable(&mut self) -> Result<Vec<Packet>> {
        let mut recovered = Vec::new();
        let sbns: Vec<u16> = self.blocks.keys().copied().collect();
        for sbn in sbns {
            let decodable = {
                let block = self.blocks.get(&sbn).unwrap();
                !block.decoded && block.present_count() >= block.source_block_length as usize
            };
            if !decodable {
                continue;
            }
            let block = self.blocks.get_mut(&sbn).unwrap();
            let Some(anchor) = &block.anchor else { continue };
            let k = block.source_block_length as usize;
            let m = (block.block_length - block.source_block_length) as usize;
            let available: Vec<(usize, Vec<u8>)> = block
                .shards
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.clone().map(|v| (i, v)))
                .collect();
            let reconstructed = decode(block.scheme, &available, k, m)?;
            for (esi, payload) in reconstructed.into_iter().enumerate() {
                if block.shards[esi].is_some() {
                    continue;
                }
                let seqnum = anchor
                    .seqnum
                    .wrapping_add(esi as u16)
                    .wrapping_sub(anchor.esi);
                let ts_delta = (esi as i64 - anchor.esi as i64) * self.samples_per_packet as i64;
                let timestamp = (anchor.timestamp as i64).wrapping_add(ts_delta) as u32;
                let packet = Packet::empty();
                packet.set_rtp(RtpView {
                    payload_type: anchor.payload_type,
                    ssrc: anchor.ssrc,
                    seqnum,
                    timestamp,
                    marker: false,
                    capture_timestamp: 0,
                    payload: Bytes::from(payload),
                });
                packet.set_flags(PacketFlags::RESTORED);
                recovered.push(packet);
            }
            block.decoded = true;
        }
        Ok(recovered)
    }

    /// Abandons any block whose end (`sbn + 1`, modulo 2¹⁶) the cursor has
    /// moved past without it becoming decodable (spec §4.6).
    pub fn advance_cursor(&mut self, sbn: u16) {
        self.cursor_sbn = Some(sbn);
        self.blocks.retain(|&block_sbn, block| block.decoded || !is_behind(block_sbn, sbn));
        while self.blocks.len() > self.capacity_blocks {
            if let Some(&oldest) = self.blocks.keys().next() {
                self.blocks.remove(&oldest);
            }
        }
    }
}

fn is_behind(sbn: u16, cursor: u16) -> bool {
    cursor.wrapping_sub(sbn) < 0x8000 && sbn != cursor
}
