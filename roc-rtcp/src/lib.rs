//! RTCP compound packet model (spec §4.12, §6): SR, RR, SDES, BYE, and XR
//! with RRTR/DLRR/MeasurementInfo/DelayMetrics/QueueMetrics sub-blocks.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod goodbye;
pub mod header;
pub mod packet;
pub mod receiver_report;
pub mod reception_report;
pub mod sender_report;
pub mod source_description;
pub mod xr;

pub use goodbye::Goodbye;
pub use header::Header;
pub use packet::{compose, parse, RtcpPacket};
pub use receiver_report::ReceiverReport;
pub use reception_report::ReceptionReport;
pub use sender_report::SenderReport;
pub use source_description::{SdesChunk, SdesItem, SourceDescription};
pub use xr::{DlrrSubblock, ExtendedReport, XrBlock};
