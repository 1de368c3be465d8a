//! Facade crate (spec §6, §2 component 14 "Pipeline control plane"): wires
//! `roc-packet`/`roc-rtp`/`roc-fec`/`roc-rtcp`/`roc-pipeline`/`roc-ctl`
//! together into `EndpointSet`/`Slot` handles, the way the teacher's `rtc`
//! crate wires `rtc-ice`/`rtc-dtls`/`rtc-sctp` into a `PeerConnection`.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod config;
pub mod control;
pub mod endpoint_set;
pub mod slot;
pub mod testutil;
pub mod uri;

pub use config::{EndpointSetConfig, FecConfig};
pub use control::ControlTransport;
pub use endpoint_set::{ReceiverEndpointSet, SenderEndpointSet};
pub use slot::{ReceiverSlot, ReceiverSlotConfig, SenderSlot, SenderSlotConfig};
pub use uri::{parse as parse_uri, EndpointUri, Interface};
