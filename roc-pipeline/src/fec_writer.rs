//! FEC writer (sender, spec §4.2): groups source packets into blocks and
//! emits repair packets alongside them.

use bytes::Bytes;

use roc_fec::{encode, FecScheme};
use roc_packet::views::FecView;
use roc_packet::{Packet, PacketSink};
use roc_shared::error::{Error, Result};

pub struct FecWriterConfig {
    pub scheme: FecScheme,
    pub n: u16,
    pub m: u16,
}

pub struct FecWriter<S: PacketSink> {
    sink: S,
    config: FecWriterConfig,
    pending_config: Option<FecWriterConfig>,
    source_block_number: u16,
    buffer: Vec<Packet>,
}

impl<S: PacketSink> FecWriter<S> {
    pub fn new(sink: S, config: FecWriterConfig) -> Self {
        Self {
            sink,
            config,
            pending_config: None,
            source_block_number: 0,
            buffer: Vec::new(),
        }
    }

    /// Reconfigures `n`/`m`/`scheme`, taking effect at the next block
    /// boundary (spec §4.2: "the change takes effect at the next block
    /// boundary").
    pub fn reconfigure(&mut self, config: FecWriterConfig) {
        self.pending_config = Some(config);
    }

    fn flush_block(&mut self) -> Result<()> {
        let n = self.config.n as usize;
        let m = self.config.m as usize;
        let block_length = (n + m) as u16;

        let payloads: Vec<Vec<u8>> = self
            .buffer
            .iter()
            .map(|p| p.rtp().map(|v| v.payload.to_vec()).unwrap_or_default())
            .collect();

        for (i, packet) in self.buffer.iter().enumerate() {
            packet.set_fec(FecView {
                scheme: self.config.scheme,
                encoding_symbol_id: i as u16,
                source_block_number: self.source_block_number,
                source_block_length: self.config.n,
                block_length,
                payload: Bytes::new(),
            });
        }

        let repair_payloads = if m > 0 {
            encode(self.config.scheme, &payloads, m)?
        } else {
            Vec::new()
        };

        for packet in self.buffer.drain(..) {
            self.sink.write(packet)?;
        }

        for (i, payload) in repair_payloads.into_iter().enumerate() {
            let repair = Packet::empty();
            repair.set_flags(roc_packet::PacketFlags::REPAIR);
            repair.set_fec(FecView {
                scheme: self.config.scheme,
                encoding_symbol_id: i as u16,
                source_block_number: self.source_block_number,
                source_block_length: self.config.n,
                block_length,
                payload: Bytes::from(payload),
            });
            self.sink.write(repair)?;
        }

        self.source_block_number = self.source_block_number.wrapping_add(1);
        if let Some(pending) = self.pending_config.take() {
            self.config = pending;
        }
        Ok(())
    }
}

impl<S: PacketSink> PacketSink for FecWriter<S> {
    fn write(&mut self, packet: Packet) -> Result<()> {
        if packet.rtp().is_none() {
            return Err(Error::BadOperation);
        }
        self.buffer.push(packet);
        if self.buffer.len() >= self.config.n as usize {
            self.flush_block()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn source_packet(seqnum: u16) -> Packet {
        let packet = Packet::empty();
        packet.set_rtp(RtpView {
            payload_type: 11,
            ssrc: 1,
            seqnum,
            timestamp: seqnum as u32 * 10,
            marker: false,
            capture_timestamp: 0,
            payload: Bytes::from(vec![seqnum as u8; 8]),
        });
        packet
    }

    #[test]
    fn emits_source_and_repair_packets_per_block() {
        let sink = VecSink::default();
        let out = sink.0.clone();
        let mut writer = FecWriter::new(
            sink,
            FecWriterConfig {
                scheme: FecScheme::ReedSolomon8m,
                n: 4,
                m: 2,
            },
        );
        for i in 0..4 {
            writer.write(source_packet(i)).unwrap();
        }
        let packets = out.lock().unwrap();
        assert_eq!(packets.len(), 6);
        assert_eq!(
            packets.iter().filter(|p| p.has_flags(roc_packet::PacketFlags::REPAIR)).count(),
            2
        );
        for p in packets.iter() {
            let fec = p.fec().unwrap();
            assert_eq!(fec.source_block_length, 4);
            assert_eq!(fec.block_length, 6);
        }
    }

    #[test]
    fn block_number_advances_across_blocks() {
        let sink = VecSink::default();
        let out = sink.0.clone();
        let mut writer = FecWriter::new(
            sink,
            FecWriterConfig {
                scheme: FecScheme::ReedSolomon8m,
                n: 2,
                m: 1,
            },
        );
        for i in 0..4 {
            writer.write(source_packet(i)).unwrap();
        }
        let packets = out.lock().unwrap();
        let sbns: Vec<u16> = packets.iter().map(|p| p.fec().unwrap().source_block_number).collect();
        assert_eq!(sbns, vec![0, 0, 0, 1, 1, 1]);
    }
}
