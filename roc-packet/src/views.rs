//! Sub-views attachable to a [`crate::Packet`] (spec §3).

use bytes::Bytes;
use roc_shared::time::Nanos;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpView {
    pub source: SocketAddr,
    pub destination: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpView {
    pub payload_type: u8,
    pub ssrc: u32,
    pub seqnum: u16,
    pub timestamp: u32,
    pub marker: bool,
    pub capture_timestamp: Nanos,
    pub payload: Bytes,
}

/// The FEC scheme a packet's [`FecView`] was produced under. The wire
/// layout of the addressing fields is identical between schemes; only the
/// semantics of the trailing length field differ (spec §9 open question:
/// "block_length" vs "n_prime").
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FecScheme {
    ReedSolomon8m,
    LdpcStaircase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FecView {
    pub scheme: FecScheme,
    pub encoding_symbol_id: u16,
    pub source_block_number: u16,
    pub source_block_length: u16,
    pub block_length: u16,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpView {
    pub compound: Bytes,
}
