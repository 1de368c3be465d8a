//! Latency tuner: the core control loop converging the receiver's (or
//! sender's) resampler scale to keep measured latency at its target (spec
//! §4.9).

use crate::freq_estimator::{FreqEstimator, TunerProfile};
use roc_shared::error::{Error, Result};
use roc_shared::time::Nanos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerBackend {
    Niq,
    E2e,
}

#[derive(Debug, Clone, Copy)]
pub struct LatencyTunerConfig {
    pub target_latency: Nanos,
    pub latency_tolerance: Nanos,
    pub stale_tolerance: Nanos,
    pub scaling_interval: Nanos,
    pub scaling_tolerance: f64,
    pub profile: TunerProfile,
    pub backend: TunerBackend,
}

impl LatencyTunerConfig {
    /// Fills `0`-valued fields per spec §4.9's defaulting rules.
    /// `deployment_default_target` supplies `target_latency` when it's 0;
    /// `is_sender` doubles the tolerance so the receiver trips its bounds
    /// check first when both sides tune.
    pub fn deduce_defaults(mut self, deployment_default_target: Nanos, is_sender: bool) -> Result<Self> {
        if self.target_latency == 0 {
            self.target_latency = deployment_default_target;
        }
        if self.target_latency == 0 {
            return Err(Error::BadConfig("latency tuner: target_latency must be non-zero".into()));
        }
        if self.latency_tolerance == 0 {
            self.latency_tolerance = derive_tolerance(self.target_latency);
            if is_sender {
                self.latency_tolerance *= 2;
            }
        }
        if self.stale_tolerance == 0 {
            self.stale_tolerance = self.latency_tolerance / 4;
        }
        if self.scaling_interval == 0 {
            self.scaling_interval = 5_000_000; // 5ms
        }
        if self.scaling_tolerance == 0.0 {
            self.scaling_tolerance = 0.005;
        }
        Ok(self)
    }
}

/// `target · log10(400) / log10(2·target_ms)`: ≈8× at 1ms, 1× at 200ms,
/// ≈0.72× at 2s (spec §4.9).
fn derive_tolerance(target: Nanos) -> Nanos {
    let target_ms = target as f64 / 1_000_000.0;
    let ratio = 400f64.log10() / (2.0 * target_ms).log10();
    (target as f64 * ratio).round() as Nanos
}

/// Picks a profile per spec §4.9's defaulting rules, for callers that
/// don't want to choose one explicitly.
pub fn default_profile(target_latency: Nanos, backend: TunerBackend) -> TunerProfile {
    match backend {
        TunerBackend::E2e => TunerProfile::Responsive,
        TunerBackend::Niq => {
            if target_latency < 30_000_000 {
                TunerProfile::Responsive
            } else {
                TunerProfile::Gradual
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerState {
    Uninitialized,
    Validating,
    Running,
    Terminated,
}

/// Why a [`TunerState::Terminated`] transition happened; logged at info
/// level by the owning session (spec §7 "user-visible failure").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    BoundsExceeded,
}

pub struct LatencyTuner {
    config: LatencyTunerConfig,
    state: TunerState,
    estimator: FreqEstimator,
    scale: f64,
    stream_pos: Nanos,
    last_scaling_tick: Nanos,
    in_stale_mode: bool,
}

impl LatencyTuner {
    pub fn new(config: LatencyTunerConfig) -> Result<Self> {
        if config.target_latency == 0 {
            return Err(Error::BadConfig("latency tuner requires target_latency > 0".into()));
        }
        if config.scaling_tolerance <= 0.0 || config.scaling_tolerance >= 1.0 {
            return Err(Error::BadConfig("scaling_tolerance must be in (0, 1)".into()));
        }
        Ok(Self {
            estimator: FreqEstimator::new(config.profile),
            config,
            state: TunerState::Validating,
            scale: 1.0,
            stream_pos: 0,
            last_scaling_tick: 0,
            in_stale_mode: false,
        })
    }

    pub fn state(&self) -> TunerState {
        self.state
    }

    pub fn get_scaling(&self) -> f64 {
        self.scale
    }

    fn start(&mut self) {
        if self.state == TunerState::Validating {
            self.state = TunerState::Running;
        }
    }

    /// Feeds one tick of `duration` worth of stream advance, along with the
    /// backend's current latency reading (`None` if not yet available,
    /// per spec §4.9 step 1) and `niq_stalling` (used for the stale-mode
    /// gate). Returns `Err` only once, the tick that trips the bounds
    /// check — callers should treat the tuner as [`TunerState::Terminated`]
    /// afterward.
    pub fn advance_stream(&mut self, duration: Nanos, latency: Option<Nanos>, niq_stalling: Nanos) -> Result<()> {
        if self.state == TunerState::Terminated {
            return Err(Error::BadOperation);
        }
        self.start();

        let latency = match latency {
            Some(l) => l,
            None => return Ok(()),
        };

        self.in_stale_mode = niq_stalling > self.config.stale_tolerance;

        let lo = self.config.target_latency.saturating_sub(self.config.latency_tolerance);
        let hi = self.config.target_latency + self.config.latency_tolerance;
        if !self.in_stale_mode && (latency < lo || latency > hi) {
            self.state = TunerState::Terminated;
            return Err(Error::BadOperation);
        }

        self.stream_pos += duration;
        while self.stream_pos >= self.last_scaling_tick + self.config.scaling_interval {
            self.last_scaling_tick += self.config.scaling_interval;
            let err = (latency as f64 - self.config.target_latency as f64) / self.config.target_latency as f64;
            let raw_scale = self.estimator.feed(err);
            self.scale = raw_scale.clamp(
                1.0 - self.config.scaling_tolerance,
                1.0 + self.config.scaling_tolerance,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduce_defaults_matches_known_ratios() {
        assert!((derive_tolerance(1_000_000) as f64 / 1_000_000.0 - 8.64).abs() < 0.1);
        assert!((derive_tolerance(200_000_000) as f64 / 200_000_000.0 - 1.0).abs() < 0.01);
        assert!((derive_tolerance(2_000_000_000) as f64 / 2_000_000_000.0 - 0.72).abs() < 0.02);
    }

    #[test]
    fn sender_tolerance_is_doubled() {
        let cfg = LatencyTunerConfig {
            target_latency: 200_000_000,
            latency_tolerance: 0,
            stale_tolerance: 0,
            scaling_interval: 0,
            scaling_tolerance: 0.0,
            profile: TunerProfile::Gradual,
            backend: TunerBackend::Niq,
        };
        let receiver = cfg.deduce_defaults(0, false).unwrap();
        let sender = cfg.deduce_defaults(0, true).unwrap();
        assert_eq!(sender.latency_tolerance, receiver.latency_tolerance * 2);
    }

    #[test]
    fn scaling_stays_within_clamp() {
        let cfg = LatencyTunerConfig {
            target_latency: 100_000_000,
            latency_tolerance: 50_000_000,
            stale_tolerance: 10_000_000,
            scaling_interval: 1_000_000,
            scaling_tolerance: 0.005,
            profile: TunerProfile::Responsive,
            backend: TunerBackend::Niq,
        }
        .deduce_defaults(0, false)
        .unwrap();
        let mut tuner = LatencyTuner::new(cfg).unwrap();
        for i in 0..200 {
            let latency = 100_000_000 + (i % 7) * 1_000_000;
            tuner.advance_stream(1_000_000, Some(latency), 0).unwrap();
            assert!((tuner.get_scaling() - 1.0).abs() <= cfg.scaling_tolerance + 1e-12);
        }
    }

    #[test]
    fn terminates_when_out_of_bounds() {
        let cfg = LatencyTunerConfig {
            target_latency: 100_000_000,
            latency_tolerance: 10_000_000,
            stale_tolerance: 1,
            scaling_interval: 1_000_000,
            scaling_tolerance: 0.005,
            profile: TunerProfile::Responsive,
            backend: TunerBackend::Niq,
        };
        let mut tuner = LatencyTuner::new(cfg).unwrap();
        assert!(tuner.advance_stream(1_000_000, Some(500_000_000), 0).is_err());
        assert_eq!(tuner.state(), TunerState::Terminated);
    }
}
