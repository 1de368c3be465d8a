//! Sender router (spec §4.4): fans a single outgoing packet stream out to
//! up to a small fixed number of routes (source port, repair port, RTCP
//! port, ...), each accepting only the flags and source id it was bound to.

use roc_packet::{Packet, PacketFlags, PacketSink};
use roc_shared::error::Result;

struct Route<S: PacketSink> {
    mask: PacketFlags,
    writer: S,
    source_id: Option<u32>,
    source_fixed: bool,
    declares_no_source: bool,
}

/// Dispatches outgoing packets to every bound route whose flags mask and
/// source id accept them (spec §4.4 "Sender router").
pub struct Router<S: PacketSink> {
    routes: Vec<Route<S>>,
}

impl<S: PacketSink> Router<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Binds a new route. `declares_no_source` should be set for plain RTCP
    /// routes, which accept packets regardless of SSRC (spec §4.4: "no
    /// source id" for plain RTCP).
    pub fn bind(&mut self, mask: PacketFlags, writer: S, declares_no_source: bool) {
        self.routes.push(Route {
            mask,
            writer,
            source_id: None,
            source_fixed: false,
            declares_no_source,
        });
    }

    /// Writes `packet` to every route whose mask and source id accept it.
    /// The first packet written to a route fixes that route's source id
    /// from the packet's RTP SSRC (spec §4.4).
    pub fn write(&mut self, packet: Packet) -> Result<()> {
        let packet_flags = packet.flags();
        let packet_ssrc = packet.rtp().map(|v| v.ssrc);
        for route in &mut self.routes {
            if !packet_flags.contains(route.mask) {
                continue;
            }
            if !route.source_fixed {
                route.source_fixed = true;
                route.source_id = if route.declares_no_source { None } else { packet_ssrc };
            }
            let matches_source = route.source_id.is_none() || route.source_id == packet_ssrc;
            if matches_source {
                route.writer.write(packet.clone())?;
            }
        }
        Ok(())
    }
}

impl<S: PacketSink> Default for Router<S> {
    fn default() -> Self {
        Self::new()
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

    fn source_packet(ssrc: u32) -> Packet {
        let p = Packet::empty();
        p.set_rtp(RtpView {
            payload_type: 11,
            ssrc,
            seqnum: 0,
            timestamp: 0,
            marker: false,
            capture_timestamp: 0,
            payload: Bytes::new(),
        });
        p
    }

    /// A repair packet as `FecWriter` actually builds one: a `Repair` flag
    /// and a FEC view, but no RTP view at all (spec §4.2).
    fn repair_packet() -> Packet {
        let p = Packet::empty();
        p.set_flags(PacketFlags::REPAIR);
        p
    }

    #[test]
    fn forwards_only_matching_mask_and_source() {
        let source_sink = VecSink::default();
        let repair_sink = VecSink::default();
        let source_out = source_sink.0.clone();
        let repair_out = repair_sink.0.clone();

        let mut router = Router::new();
        router.bind(PacketFlags::RTP | PacketFlags::AUDIO, source_sink, false);
        router.bind(PacketFlags::REPAIR, repair_sink, false);

        router.write(source_packet(1)).unwrap();
        router.write(repair_packet()).unwrap();
        router.write(source_packet(2)).unwrap();

        assert_eq!(source_out.lock().unwrap().len(), 1);
        assert_eq!(repair_out.lock().unwrap().len(), 1);
    }
}
