//! [`Packet`]: the reference-counted tagged-union object that is the
//! currency of the packet hot path (spec §3).

use crate::flags::PacketFlags;
use crate::views::{FecView, RtcpView, RtpView, UdpView};
use bytes::Bytes;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct PacketState {
    flags: PacketFlags,
    udp: Option<UdpView>,
    rtp: Option<RtpView>,
    fec: Option<FecView>,
    rtcp: Option<RtcpView>,
}

struct PacketInner {
    /// The raw datagram payload. Immutable: once `Composed` is set this is
    /// the authoritative serialization of the sub-views below (spec §3
    /// invariant). Parsed packets set this once at construction and never
    /// touch it again.
    data: Bytes,
    state: Mutex<PacketState>,
}

/// A cheaply-clonable handle to a packet. Every clone shares the same
/// underlying allocation; the packet is returned to its pool (if it came
/// from one) only once the last handle is dropped (spec §3 "Ownership").
#[derive(Clone)]
pub struct Packet(Arc<PacketInner>);

impl Packet {
    /// Wraps a raw byte slice with no sub-views and no flags. Parsers call
    /// this, then attach whichever views they recognized.
    pub fn from_bytes(data: Bytes) -> Packet {
        Packet(Arc::new(PacketInner {
            data,
            state: Mutex::new(PacketState::default()),
        }))
    }

    /// Builds an empty packet for a composer to fill in before
    /// serialization (no bytes exist yet).
    pub fn empty() -> Packet {
        Packet::from_bytes(Bytes::new())
    }

    pub fn data(&self) -> Bytes {
        self.0.data.clone()
    }

    pub fn flags(&self) -> PacketFlags {
        self.0.state.lock().unwrap().flags
    }

    pub fn set_flags(&self, flags: PacketFlags) {
        self.0.state.lock().unwrap().flags.insert(flags);
    }

    pub fn has_flags(&self, flags: PacketFlags) -> bool {
        self.flags().contains(flags)
    }

    pub fn udp(&self) -> Option<UdpView> {
        self.0.state.lock().unwrap().udp.clone()
    }

    pub fn set_udp(&self, view: UdpView) {
        let mut state = self.0.state.lock().unwrap();
        state.flags.insert(PacketFlags::UDP);
        state.udp = Some(view);
    }

    pub fn rtp(&self) -> Option<RtpView> {
        self.0.state.lock().unwrap().rtp.clone()
    }

    pub fn set_rtp(&self, view: RtpView) {
        let mut state = self.0.state.lock().unwrap();
        state.flags.insert(PacketFlags::RTP | PacketFlags::AUDIO);
        state.rtp = Some(view);
    }

    pub fn fec(&self) -> Option<FecView> {
        self.0.state.lock().unwrap().fec.clone()
    }

    /// Patches (or attaches) the FEC view. Called both at initial
    /// composition and later by the FEC writer, which back-patches every
    /// source packet of a block once the block's length is known (spec
    /// §4.2).
    pub fn set_fec(&self, view: FecView) {
        let mut state = self.0.state.lock().unwrap();
        state.flags.insert(PacketFlags::FEC);
        state.fec = Some(view);
    }

    pub fn rtcp(&self) -> Option<RtcpView> {
        self.0.state.lock().unwrap().rtcp.clone()
    }

    pub fn set_rtcp(&self, view: RtcpView) {
        let mut state = self.0.state.lock().unwrap();
        state.flags.insert(PacketFlags::RTCP);
        state.rtcp = Some(view);
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.state.lock().unwrap();
        f.debug_struct("Packet")
            .field("flags", &state.flags)
            .field("len", &self.0.data.len())
            .finish()
    }
}
