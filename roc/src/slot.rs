//! Sender and receiver slots (spec §6 "Endpoint set / slot"): the pipeline
//! control plane that wires the packet-domain stages in `roc_pipeline`
//! together into one coherent session, the way the teacher's
//! `peer_connection` module wires `ice`/`dtls`/`sctp` transports into one
//! `RTCPeerConnection`.

use roc_audio::{Frame, FrameWriter, SampleSpec};
use roc_ctl::{LatencyTuner, LatencyTunerConfig};
use roc_packet::{FecScheme, Packet, PacketFlags, PacketSink};
use roc_pipeline::{
    Depacketizer, DepacketizerConfig, FecReader, FecWriter, FecWriterConfig, Interleaver, LinkMeter,
    Packetizer, ReorderQueue, ReorderQueueConfig, Router, SessionHandle, Watchdog, WatchdogConfig,
};
use roc_shared::error::Result;
use roc_shared::time::Nanos;

/// Lets a [`Router`] stand in wherever a [`PacketSink`] is required; the
/// router type itself only exposes an inherent `write`, mirroring the
/// teacher's pattern of keeping dispatch fan-out off the trait it fans out
/// to (spec §4.4).
struct RouterSink<S: PacketSink>(Router<S>);

impl<S: PacketSink> PacketSink for RouterSink<S> {
    fn write(&mut self, packet: Packet) -> Result<()> {
        self.0.write(packet)
    }
}

pub struct SenderSlotConfig {
    pub sample_spec: SampleSpec,
    pub payload_type: u8,
    pub packet_length: Nanos,
    pub fec: Option<(FecScheme, u16, u16)>,
    pub interleaving: bool,
}

/// A sender-side session: one `AudioSource`, optionally an `AudioRepair`,
/// wired as packetizer -> (FEC writer -> interleaver)? -> router (spec
/// §4.1-§4.4).
pub struct SenderSlot {
    packetizer: Packetizer<Box<dyn PacketSink>>,
    ssrc: u32,
}

impl SenderSlot {
    pub fn new(
        config: SenderSlotConfig,
        source_transport: Box<dyn PacketSink>,
        repair_transport: Option<Box<dyn PacketSink>>,
    ) -> Self {
        let mut router = Router::new();
        router.bind(PacketFlags::RTP | PacketFlags::AUDIO, source_transport, false);
        if let Some(repair_transport) = repair_transport {
            router.bind(PacketFlags::REPAIR, repair_transport, false);
        }
        let router_sink: Box<dyn PacketSink> = Box::new(RouterSink(router));

        let chain: Box<dyn PacketSink> = match config.fec {
            Some((scheme, n, m)) => {
                let fec_writer = FecWriter::new(router_sink, FecWriterConfig { scheme, n, m });
                if config.interleaving {
                    Box::new(Interleaver::new(fec_writer, (n + m) as usize))
                } else {
                    Box::new(fec_writer)
                }
            }
            None => router_sink,
        };

        let packetizer = Packetizer::new(chain, config.sample_spec, config.payload_type, config.packet_length);
        let ssrc = packetizer.ssrc();
        Self { packetizer, ssrc }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Captures one frame of audio, packetizing (and FEC-protecting,
    /// interleaving, routing) it downstream.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.packetizer.write(frame)
    }

    /// Snapshot of send-side counters for an RTCP sender report (spec
    /// §4.12): total packets, total payload bytes, and the RTP timestamp
    /// the next packet would carry.
    pub fn report_stats(&self) -> (u64, u64, u32) {
        (self.packetizer.packets_sent(), self.packetizer.octets_sent(), self.packetizer.timestamp())
    }
}

pub struct ReceiverSlotConfig {
    pub sample_spec: SampleSpec,
    pub fec_capacity_blocks: Option<usize>,
    pub packet_length: Nanos,
    pub reorder_capacity: usize,
    pub tuner: LatencyTunerConfig,
    pub watchdog: WatchdogConfig,
}

/// A receiver-side session: reorder queue + optional FEC reader feeding a
/// depacketizer, with a watchdog and latency tuner observing every produced
/// frame (spec §4.4-§4.9).
pub struct ReceiverSlot {
    packet_length: Nanos,
    queue: ReorderQueue,
    fec_reader: Option<FecReader>,
    depacketizer: Depacketizer,
    watchdog: Watchdog,
    tuner: LatencyTuner,
    link_meter: LinkMeter,
    link_seq: roc_packet::SeqExtender,
    arrivals: i64,
    niq_latency: Nanos,
    niq_stalling: Nanos,
    ssrc: Option<u32>,
}

impl ReceiverSlot {
    pub fn new(config: ReceiverSlotConfig) -> Result<Self> {
        let samples_per_packet =
            roc_shared::time::ns_to_samples(config.packet_length, config.sample_spec.sample_rate) as u32;
        Ok(Self {
            packet_length: config.packet_length,
            queue: ReorderQueue::new(ReorderQueueConfig { capacity_packets: config.reorder_capacity }),
            fec_reader: config
                .fec_capacity_blocks
                .map(|capacity| FecReader::new(samples_per_packet, capacity)),
            depacketizer: Depacketizer::new(DepacketizerConfig::new(
                config.sample_spec.sample_rate,
                config.sample_spec.num_channels(),
            )),
            watchdog: Watchdog::new(config.watchdog),
            tuner: LatencyTuner::new(config.tuner)?,
            link_meter: LinkMeter::new(),
            link_seq: roc_packet::SeqExtender::new(),
            arrivals: 0,
            niq_latency: 0,
            niq_stalling: 0,
            ssrc: None,
        })
    }

    pub fn ssrc(&self) -> Option<u32> {
        self.ssrc
    }

    /// Snapshot of receive-side observables for an RTCP receiver report
    /// (spec §4.5, §4.12): network-incoming-queue latency and stalling
    /// time come straight from the jitter buffer/watchdog; loss and jitter
    /// come from the RFC 3550 link meter fed by every arriving source
    /// packet. `e2e_latency` is left at zero — this toolkit's timestamps
    /// are relative-nanosecond, not wall-clock, so there is no sender
    /// capture time to difference against on this side.
    pub fn latency_metrics(&mut self) -> roc_ctl::LatencyMetrics {
        roc_ctl::LatencyMetrics {
            niq_latency: self.niq_latency,
            niq_stalling: self.niq_stalling,
            e2e_latency: 0,
            jitter: self.link_meter.jitter_rtp_units() as Nanos,
            fract_loss: self.link_meter.fract_loss_since_last_report(),
            cum_loss: self.link_meter.cum_lost(),
        }
    }

    /// Feeds one arrived packet: repair packets (no RTP view of their own)
    /// go to the FEC reader only; source packets go to both the FEC reader
    /// (for future recovery) and the reorder queue (spec §4.5, §4.6).
    pub fn on_packet(&mut self, packet: Packet) {
        if packet.has_flags(PacketFlags::REPAIR) {
            if let Some(reader) = &mut self.fec_reader {
                let _ = reader.push_repair(&packet);
            }
            return;
        }
        let Some(rtp) = packet.rtp() else { return };
        self.ssrc.get_or_insert(rtp.ssrc);
        let ext_seq = self.link_seq.extend(rtp.seqnum);
        self.arrivals += 1;
        self.link_meter.on_packet_arrival(ext_seq, self.arrivals, rtp.timestamp as i64);
        if let Some(reader) = &mut self.fec_reader {
            let _ = reader.push_source(&packet);
        }
        self.queue.push(rtp.seqnum, packet);
    }

    /// Drains any FEC blocks that became decodable, stitches the reorder
    /// queue into a frame, and advances the watchdog/latency tuner on the
    /// result (spec §4.6-§4.9).
    pub fn produce_frame(&mut self, now: Nanos, frame: &mut Frame) -> Result<Option<roc_pipeline::DeathCause>> {
        if let Some(reader) = &mut self.fec_reader {
            for recovered in reader.drain_decodable()? {
                let seqnum = recovered.rtp().map(|v| v.seqnum).unwrap_or(0);
                self.queue.push(seqnum, recovered);
            }
        }
        let mut latest_sbn = None;
        while let Some((_, packet)) = self.queue.pop_front() {
            if let Some(fec) = packet.fec() {
                latest_sbn = Some(fec.source_block_number);
            }
            self.depacketizer.push(packet);
        }
        // The read cursor has now advanced past every block whose packets
        // were just consumed; any earlier block that never became
        // decodable is abandoned (spec §4.6).
        if let (Some(reader), Some(sbn)) = (&mut self.fec_reader, latest_sbn) {
            reader.advance_cursor(sbn);
        }

        let niq_latency = self.queue.len() as Nanos * self.packet_length;
        self.niq_latency = niq_latency;
        self.depacketizer.read(frame)?;

        if frame.flags.contains(roc_audio::FrameFlags::BLANK) {
            self.niq_stalling += self.packet_length;
        } else {
            self.niq_stalling = 0;
        }

        let _ = self.tuner.advance_stream(self.packet_length, Some(niq_latency), self.niq_stalling);
        Ok(self.watchdog.on_frame(now, frame.flags))
    }

    pub fn scaling(&self) -> f64 {
        self.tuner.get_scaling()
    }
}

impl SessionHandle for ReceiverSlot {
    fn niq_stalling(&self) -> Nanos {
        self.niq_stalling
    }
}
