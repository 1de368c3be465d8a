//! Sender-side mirror of the latency tuner: absorbs RTCP feedback from the
//! receiver and drives a local [`LatencyTuner`] when the deployment chooses
//! sender-side tuning (spec §4.9 "Feedback monitor").

use crate::latency_tuner::LatencyTuner;
use roc_shared::time::Nanos;

const DEFAULT_SOURCE_COOLDOWN: Nanos = 50_000_000;
const DEFAULT_SOURCE_TIMEOUT: Nanos = 1_500_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyMetrics {
    pub niq_latency: Nanos,
    pub niq_stalling: Nanos,
    pub e2e_latency: Nanos,
    pub jitter: Nanos,
    pub fract_loss: f32,
    pub cum_loss: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkMetrics {
    pub rtt: Option<Nanos>,
}

pub struct FeedbackMonitor {
    tuner: LatencyTuner,
    source: Option<u32>,
    last_feedback_at: Nanos,
    last_switch_at: Nanos,
    source_cooldown: Nanos,
    source_timeout: Nanos,
    last_metrics: Option<(LatencyMetrics, LinkMetrics)>,
}

impl FeedbackMonitor {
    pub fn new(tuner: LatencyTuner) -> Self {
        Self {
            tuner,
            source: None,
            last_feedback_at: 0,
            last_switch_at: 0,
            source_cooldown: DEFAULT_SOURCE_COOLDOWN,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            last_metrics: None,
        }
    }

    pub fn with_source_cooldown(mut self, cooldown: Nanos) -> Self {
        self.source_cooldown = cooldown;
        self
    }

    pub fn with_source_timeout(mut self, timeout: Nanos) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Accepts one feedback report observed at monotonic time `now`.
    /// First feedback fixes the source; a different source is ignored
    /// until the cooldown elapses, then it replaces the old one.
    /// No feedback for `source_timeout` resets the monitor so the next
    /// arrival is treated as new (spec §4.9).
    pub fn process_feedback(
        &mut self,
        now: Nanos,
        source_id: u32,
        latency: LatencyMetrics,
        link: LinkMetrics,
    ) {
        if let Some(current) = self.source {
            if now.saturating_sub(self.last_feedback_at) > self.source_timeout {
                self.source = None;
            } else if current != source_id && now.saturating_sub(self.last_switch_at) < self.source_cooldown {
                return;
            }
        }

        if self.source != Some(source_id) {
            self.source = Some(source_id);
            self.last_switch_at = now;
        }
        self.last_feedback_at = now;
        self.last_metrics = Some((latency, link));
    }

    /// Feeds the most recent accepted report into the local tuner for
    /// `duration` worth of stream advance. Called once per written frame.
    pub fn write(&mut self, duration: Nanos) {
        let latency = self.last_metrics.map(|(l, _)| l.niq_latency);
        let stalling = self.last_metrics.map(|(l, _)| l.niq_stalling).unwrap_or(0);
        let _ = self.tuner.advance_stream(duration, latency, stalling);
    }

    pub fn scaling(&self) -> f64 {
        self.tuner.get_scaling()
    }

    pub fn current_source(&self) -> Option<u32> {
        self.source
    }
}
