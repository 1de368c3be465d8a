//! Sender packetization/FEC path and receiver reorder/depacketization path
//! (spec §4.1-§4.8): the stages that sit between the raw packet model and
//! the audio pipeline.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod depacketizer;
pub mod fec_reader;
pub mod fec_writer;
pub mod interleaver;
pub mod packetizer;
pub mod reorder_queue;
pub mod router;
pub mod session_router;
pub mod watchdog;

pub use depacketizer::{Depacketizer, DepacketizerConfig};
pub use fec_reader::FecReader;
pub use fec_writer::{FecWriter, FecWriterConfig};
pub use interleaver::Interleaver;
pub use packetizer::Packetizer;
pub use reorder_queue::{LinkMeter, ReorderQueue, ReorderQueueConfig};
pub use router::Router;
pub use session_router::{AllowAll, SessionHandle, SessionRouter, SessionSlotPolicy};
pub use watchdog::{DeathCause, Watchdog, WatchdogConfig};
