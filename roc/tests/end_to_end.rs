//! End-to-end scenarios (spec §8): a sender slot and a receiver slot
//! connected through an in-process [`LossyLink`] instead of real UDP
//! sockets, driven synchronously one packet-length tick at a time.

use bytes::Bytes;
use roc_audio::{ChannelSet, Frame, FrameFlags, SampleSpec};
use roc_ctl::{LatencyTunerConfig, TunerBackend, TunerProfile};
use roc_packet::views::RtpView;
use roc_packet::{FecScheme, Packet, PacketSink};
use roc_pipeline::WatchdogConfig;
use roc::control::testutil::QueueTransport;
use roc::slot::{ReceiverSlot, ReceiverSlotConfig, SenderSlot, SenderSlotConfig};
use roc::testutil::{drain, BurstLoss, LossyLink, NoLoss, PeriodicLoss};
use roc::{EndpointSetConfig, ReceiverEndpointSet, SenderEndpointSet};
use std::sync::{Arc, Mutex};

const SAMPLE_RATE: u32 = 44100;
const PACKET_LENGTH_NS: u64 = 10_000_000; // 10ms
const SAMPLES_PER_PACKET: usize = 441; // per channel, at 44100Hz/10ms

fn tuner_config(target_latency: u64) -> LatencyTunerConfig {
    LatencyTunerConfig {
        target_latency,
        latency_tolerance: 0,
        stale_tolerance: 0,
        scaling_interval: 0,
        scaling_tolerance: 0.0,
        profile: TunerProfile::Responsive,
        backend: TunerBackend::Niq,
    }
    .deduce_defaults(target_latency, false)
    .unwrap()
}

fn run_stream(
    sender: &mut SenderSlot,
    receiver: &mut ReceiverSlot,
    link_queue: &std::sync::Arc<std::sync::Mutex<Vec<roc_packet::Packet>>>,
    num_packets: u32,
) -> Vec<Frame> {
    let channels = 2;
    for i in 0..num_packets {
        let mut frame = Frame::new(SAMPLES_PER_PACKET * channels);
        frame.samples_mut().fill(0.1 + (i as f32) * 0.001);
        sender.write_frame(&frame).unwrap();
    }
    for packet in drain(link_queue) {
        receiver.on_packet(packet);
    }
    let mut out = Vec::new();
    for i in 0..num_packets {
        let mut frame = Frame::new(SAMPLES_PER_PACKET * channels);
        receiver
            .produce_frame((i as u64) * PACKET_LENGTH_NS, &mut frame)
            .unwrap();
        out.push(frame);
    }
    out
}

#[test]
fn lossless_stereo_no_fec() {
    let sample_spec = SampleSpec::new(SAMPLE_RATE, ChannelSet::stereo());
    let (link, queue) = LossyLink::new(NoLoss);

    let mut sender = SenderSlot::new(
        SenderSlotConfig {
            sample_spec,
            payload_type: 10,
            packet_length: PACKET_LENGTH_NS,
            fec: None,
            interleaving: false,
        },
        Box::new(link) as Box<dyn PacketSink>,
        None,
    );
    let mut receiver = ReceiverSlot::new(ReceiverSlotConfig {
        sample_spec,
        fec_capacity_blocks: None,
        packet_length: PACKET_LENGTH_NS,
        reorder_capacity: 64,
        tuner: tuner_config(200_000_000),
        watchdog: WatchdogConfig::default(),
    })
    .unwrap();

    let frames = run_stream(&mut sender, &mut receiver, &queue, 50);

    assert!(frames.iter().all(|f| !f.flags.contains(FrameFlags::BLANK)));
    assert!(frames.iter().all(|f| !f.flags.contains(FrameFlags::INCOMPLETE)));
}

#[test]
fn ten_percent_loss_recovered_by_reed_solomon_10_plus_5() {
    let sample_spec = SampleSpec::new(SAMPLE_RATE, ChannelSet::stereo());
    // One dropped source packet in every ten, well inside the m=5-per-15
    // capacity; the repair channel arrives intact.
    let queue = Arc::new(Mutex::new(Vec::new()));
    let source_link = LossyLink::with_queue(PeriodicLoss::new(10, 1), queue.clone());
    let repair_link = LossyLink::with_queue(NoLoss, queue.clone());

    let mut sender = SenderSlot::new(
        SenderSlotConfig {
            sample_spec,
            payload_type: 10,
            packet_length: PACKET_LENGTH_NS,
            fec: Some((FecScheme::ReedSolomon8m, 10, 5)),
            interleaving: true,
        },
        Box::new(source_link) as Box<dyn PacketSink>,
        Some(Box::new(repair_link) as Box<dyn PacketSink>),
    );
    let mut receiver = ReceiverSlot::new(ReceiverSlotConfig {
        sample_spec,
        fec_capacity_blocks: Some(8),
        packet_length: PACKET_LENGTH_NS,
        reorder_capacity: 64,
        tuner: tuner_config(200_000_000),
        watchdog: WatchdogConfig::default(),
    })
    .unwrap();

    // Several full blocks of 10 source packets so the reader gets a chance
    // to decode every one.
    let frames = run_stream(&mut sender, &mut receiver, &queue, 60);

    let blank_count = frames.iter().filter(|f| f.flags.contains(FrameFlags::BLANK)).count();
    assert!(blank_count == 0, "FEC should have recovered every 10%-loss gap, saw {blank_count} blank frames");
}

#[test]
fn burst_loss_exceeding_fec_capacity_is_contained() {
    let sample_spec = SampleSpec::new(SAMPLE_RATE, ChannelSet::stereo());
    // Drop one whole source block's worth of packets (n=10) in a burst; the
    // block's own m=5 repair shards arrive, but 5 present < 10 needed means
    // it still can't be decoded.
    let queue = Arc::new(Mutex::new(Vec::new()));
    let source_link = LossyLink::with_queue(BurstLoss::new(20, 10), queue.clone());
    let repair_link = LossyLink::with_queue(NoLoss, queue.clone());

    let mut sender = SenderSlot::new(
        SenderSlotConfig {
            sample_spec,
            payload_type: 10,
            packet_length: PACKET_LENGTH_NS,
            fec: Some((FecScheme::ReedSolomon8m, 10, 5)),
            interleaving: false,
        },
        Box::new(source_link) as Box<dyn PacketSink>,
        Some(Box::new(repair_link) as Box<dyn PacketSink>),
    );
    let mut receiver = ReceiverSlot::new(ReceiverSlotConfig {
        sample_spec,
        fec_capacity_blocks: Some(8),
        packet_length: PACKET_LENGTH_NS,
        reorder_capacity: 64,
        tuner: tuner_config(200_000_000),
        watchdog: WatchdogConfig::default(),
    })
    .unwrap();

    let frames = run_stream(&mut sender, &mut receiver, &queue, 60);

    // The burst wipes out one whole block: some frames must come back
    // blank, but the session must not have been killed by the watchdog
    // over a single burst.
    let blank_count = frames.iter().filter(|f| f.flags.contains(FrameFlags::BLANK)).count();
    assert!(blank_count > 0, "expected the burst to produce at least one blank frame");
    assert!(blank_count < frames.len(), "a single burst must not blank the whole stream");
}

#[test]
fn rtcp_round_trip_computes_rtt_on_both_sides() {
    let sample_spec = SampleSpec::new(SAMPLE_RATE, ChannelSet::stereo());
    let config = EndpointSetConfig::new("rtp://127.0.0.1:10001", None, None, sample_spec, 10, None)
        .unwrap()
        .deduce_defaults();

    let (sender_transport, receiver_transport) = QueueTransport::pair();
    let (source_link, _queue) = LossyLink::new(NoLoss);

    let mut sender =
        SenderEndpointSet::new(&config, Box::new(source_link), None).with_control(Box::new(sender_transport));
    let mut receiver = ReceiverEndpointSet::new(config).unwrap().with_control(Box::new(receiver_transport));

    // Seed a live session so the receiver has a latency snapshot to fold
    // into its reception reports.
    let seed = Packet::empty();
    seed.set_rtp(RtpView {
        payload_type: 10,
        ssrc: sender.ssrc(),
        seqnum: 0,
        timestamp: 0,
        marker: false,
        capture_timestamp: 0,
        payload: Bytes::new(),
    });
    receiver.on_packet(seed);

    let now = std::time::Instant::now();
    assert!(sender.rtt().is_none());
    assert!(receiver.rtt().is_none());

    sender.tick_rtcp(now, 0).unwrap(); // sends the sender's first SR (no DLRR yet: no RRTR heard)
    receiver.tick_rtcp(now, 0).unwrap(); // absorbs it, replies RR + XR{RRTR, DLRR for the SR}
    sender.tick_rtcp(now, 0).unwrap(); // absorbs the DLRR (RTT!) and records the receiver's RRTR

    assert!(sender.rtt().is_some(), "sender should have an RTT after one SR/RR-DLRR round trip");
    assert!(receiver.rtt().is_none(), "receiver has no DLRR back yet, only its own RRTR sent");

    // The sender's next report interval mirrors the receiver's RRTR back as
    // its own DLRR, completing the symmetric half of the exchange.
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let later = std::time::Instant::now();
    sender.tick_rtcp(later, 0).unwrap(); // second SR, now carries a DLRR for the receiver's RRTR
    receiver.tick_rtcp(later, 0).unwrap(); // absorbs it, computes its own RTT

    assert!(receiver.rtt().is_some(), "receiver should have an RTT after the sender mirrors its RRTR back");
}
