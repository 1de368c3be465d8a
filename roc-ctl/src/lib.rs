//! Latency tuner, frequency estimator, feedback monitor, and RTCP
//! communicator driving the adaptive-latency control loop (spec §4.9,
//! §4.12).

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod feedback_monitor;
pub mod freq_estimator;
pub mod latency_tuner;
pub mod rtcp_communicator;

pub use feedback_monitor::{FeedbackMonitor, LatencyMetrics, LinkMetrics};
pub use freq_estimator::{FreqEstimator, TunerProfile};
pub use latency_tuner::{default_profile, LatencyTuner, LatencyTunerConfig, TunerBackend, TunerState};
pub use rtcp_communicator::RtcpCommunicator;
