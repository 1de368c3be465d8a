//! `EndpointSet` (spec §6 "Endpoint set / slot"): the receiver-side facade
//! that owns a [`SessionRouter`] of per-SSRC [`ReceiverSlot`]s, and the
//! sender-side facade that owns a single [`SenderSlot`], the way the
//! teacher's `PeerConnection` owns per-transceiver state behind one
//! top-level handle.

use roc_ctl::{default_profile, LatencyTunerConfig, RtcpCommunicator, TunerBackend};
use roc_packet::{Packet, PacketSink};
use roc_pipeline::{AllowAll, SessionRouter, WatchdogConfig};
use roc_shared::error::Result;
use roc_shared::time::Nanos;

use crate::config::EndpointSetConfig;
use crate::control::ControlTransport;
use crate::slot::{ReceiverSlot, ReceiverSlotConfig, SenderSlot, SenderSlotConfig};

/// An endpoint set's optional RTCP side channel: one communicator plus the
/// transport it reads/writes whole compound datagrams through (spec §4.12,
/// §6 "AudioControl").
struct RtcpChannel {
    communicator: RtcpCommunicator,
    transport: Box<dyn ControlTransport>,
}

/// Builds the [`LatencyTunerConfig`] a [`ReceiverSlot`] runs with from an
/// [`EndpointSetConfig`], applying the same defaulting chain
/// `roc-ctl::latency_tuner` exposes (spec §4.9, §6).
fn tuner_config(config: &EndpointSetConfig) -> Result<LatencyTunerConfig> {
    let profile = default_profile(config.target_latency, config.tuner_backend);
    LatencyTunerConfig {
        target_latency: config.target_latency,
        latency_tolerance: 0,
        stale_tolerance: 0,
        scaling_interval: 0,
        scaling_tolerance: 0.0,
        profile,
        backend: config.tuner_backend,
    }
    .deduce_defaults(config.target_latency, false)
}

/// A sending endpoint set: a single [`SenderSlot`] bound to the configured
/// `AudioSource`/`AudioRepair` transports.
pub struct SenderEndpointSet {
    slot: SenderSlot,
    rtcp: Option<RtcpChannel>,
}

impl SenderEndpointSet {
    pub fn new(
        config: &EndpointSetConfig,
        source_transport: Box<dyn PacketSink>,
        repair_transport: Option<Box<dyn PacketSink>>,
    ) -> Self {
        let fec = config.fec.map(|fec| (fec.scheme(), fec.n(), fec.m()));
        let slot = SenderSlot::new(
            SenderSlotConfig {
                sample_spec: config.sample_spec,
                payload_type: config.payload_type,
                packet_length: config.packet_length,
                fec,
                interleaving: fec.is_some(),
            },
            source_transport,
            repair_transport,
        );
        Self { slot, rtcp: None }
    }

    /// Attaches an RTCP control channel (spec §6 "AudioControl"): this
    /// endpoint set will now send periodic sender reports and absorb
    /// inbound receiver reports through `tick_rtcp`.
    pub fn with_control(mut self, transport: Box<dyn ControlTransport>) -> Self {
        let ssrc = self.slot.ssrc();
        self.rtcp = Some(RtcpChannel {
            communicator: RtcpCommunicator::new(ssrc, format!("sender-{ssrc}")),
            transport,
        });
        self
    }

    pub fn write_frame(&mut self, frame: &roc_audio::Frame) -> Result<()> {
        self.slot.write_frame(frame)
    }

    pub fn ssrc(&self) -> u32 {
        self.slot.ssrc()
    }

    /// Drains inbound RTCP feedback and, once the report interval has
    /// elapsed, sends a fresh sender report (spec §4.12). A no-op when no
    /// control channel was attached.
    pub fn tick_rtcp(&mut self, now: std::time::Instant, now_ns: Nanos) -> Result<()> {
        let Some(rtcp) = &mut self.rtcp else { return Ok(()) };
        while let Some(datagram) = rtcp.transport.recv()? {
            rtcp.communicator.handle_inbound(now_ns, &datagram, None)?;
        }
        if rtcp.communicator.should_report() {
            let (packets, octets, rtp_timestamp) = self.slot.report_stats();
            let datagram =
                rtcp.communicator
                    .build_sender_report(now, rtp_timestamp, packets as u32, octets as u32)?;
            rtcp.transport.send(datagram)?;
        }
        Ok(())
    }

    /// The measured round-trip time to the receiver, once at least one RTCP
    /// XR DLRR has come back (spec §4.9 "RTT computation").
    pub fn rtt(&self) -> Option<Nanos> {
        self.rtcp.as_ref().and_then(|rtcp| rtcp.communicator.any_rtt())
    }
}

/// A receiving endpoint set: a [`SessionRouter`] that creates one
/// [`ReceiverSlot`] per SSRC it first hears from, and sweeps it once its
/// watchdog would have killed it (spec §4.4, §4.8).
pub struct ReceiverEndpointSet {
    config: EndpointSetConfig,
    sessions: SessionRouter<ReceiverSlot, AllowAll, Box<dyn Fn(u32) -> ReceiverSlot>>,
    rtcp: Option<RtcpChannel>,
}

impl ReceiverEndpointSet {
    pub fn new(config: EndpointSetConfig) -> Result<Self> {
        let tuner = tuner_config(&config)?;
        let sample_spec = config.sample_spec;
        let packet_length = config.packet_length;
        let fec_capacity_blocks = config.fec.map(|_| 8);
        let no_playback_timeout = WatchdogConfig::default().no_playback_timeout;

        let factory: Box<dyn Fn(u32) -> ReceiverSlot> = Box::new(move |_ssrc| {
            ReceiverSlot::new(ReceiverSlotConfig {
                sample_spec,
                fec_capacity_blocks,
                packet_length,
                reorder_capacity: 64,
                tuner,
                watchdog: WatchdogConfig::default(),
            })
            .expect("receiver slot config is always valid once the endpoint set itself validated")
        });

        Ok(Self {
            sessions: SessionRouter::new(AllowAll, factory, no_playback_timeout),
            config,
            rtcp: None,
        })
    }

    /// Attaches an RTCP control channel (spec §6 "AudioControl"): this
    /// endpoint set will now send periodic receiver reports (with XR RRTR
    /// for the sender's own RTT computation, and XR DLRR for any sender
    /// it's heard an SR from) and absorb inbound sender reports through
    /// `tick_rtcp`.
    pub fn with_control(mut self, transport: Box<dyn ControlTransport>) -> Self {
        let local_ssrc = rand::random::<u32>();
        self.rtcp = Some(RtcpChannel {
            communicator: RtcpCommunicator::new(local_ssrc, format!("receiver-{local_ssrc}")),
            transport,
        });
        self
    }

    /// Routes one arrived packet to the session for its SSRC, creating the
    /// session on first sight (spec §4.4). Repair packets carry no RTP view
    /// of their own (spec §4.2), so there is no SSRC to demux them by; they
    /// are fed to every live session, and each session's FEC reader simply
    /// ignores the blocks it doesn't recognize.
    pub fn on_packet(&mut self, packet: Packet) {
        match packet.rtp() {
            Some(rtp) => {
                if let Some(session) = self.sessions.session_for(rtp.ssrc) {
                    session.on_packet(packet);
                }
            }
            None => {
                for ssrc in self.sessions.ssrcs() {
                    if let Some(session) = self.sessions.session_for(ssrc) {
                        session.on_packet(packet.clone());
                    }
                }
            }
        }
    }

    /// Produces one frame of output for `ssrc`'s session, if it exists.
    pub fn produce_frame(
        &mut self,
        ssrc: u32,
        now: Nanos,
        frame: &mut roc_audio::Frame,
    ) -> Result<Option<roc_pipeline::DeathCause>> {
        match self.sessions.session_for(ssrc) {
            Some(session) => session.produce_frame(now, frame),
            None => Ok(None),
        }
    }

    /// Removes every session whose watchdog no-playback deadline has
    /// elapsed, returning the SSRCs swept (spec §4.8).
    pub fn sweep_dead_sessions(&mut self) -> Vec<u32> {
        self.sessions.sweep_dead_sessions()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }

    /// The SSRCs of every currently live session, for a caller driving the
    /// produce-frame loop itself (spec §6 CLI surface).
    pub fn sessions(&self) -> Vec<u32> {
        self.sessions.ssrcs()
    }

    pub fn config(&self) -> &EndpointSetConfig {
        &self.config
    }

    /// Drains inbound RTCP sender reports and, once the report interval has
    /// elapsed, sends a fresh receiver report carrying the latency metrics
    /// of one representative live session (spec §4.12). A single
    /// `RtcpCommunicator` serves the whole endpoint set rather than one per
    /// session, so with more than one live session only the first (by SSRC
    /// order) has its metrics reported; a no-op when no control channel was
    /// attached or no session exists yet.
    pub fn tick_rtcp(&mut self, now: std::time::Instant, now_ns: Nanos) -> Result<()> {
        let Some(rtcp) = &mut self.rtcp else { return Ok(()) };
        while let Some(datagram) = rtcp.transport.recv()? {
            rtcp.communicator.handle_inbound(now_ns, &datagram, None)?;
        }
        if !rtcp.communicator.should_report() {
            return Ok(());
        }
        let mut ssrcs = self.sessions.ssrcs();
        ssrcs.sort_unstable();
        let Some(&ssrc) = ssrcs.first() else { return Ok(()) };
        let Some(session) = self.sessions.session_for(ssrc) else { return Ok(()) };
        let latency = session.latency_metrics();
        let datagram = rtcp.communicator.build_receiver_report(now, latency)?;
        rtcp.transport.send(datagram)?;
        Ok(())
    }

    /// The measured round-trip time to the sender, once that sender's SR has
    /// come back with a DLRR mirroring one of our own XR RRTRs (spec §4.9
    /// "RTT computation", symmetric with `SenderEndpointSet::rtt()`).
    pub fn rtt(&self) -> Option<Nanos> {
        self.rtcp.as_ref().and_then(|rtcp| rtcp.communicator.any_rtt())
    }
}
