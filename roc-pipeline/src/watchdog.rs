//! Watchdog (receiver, spec §4.8): three rolling deadlines that can declare
//! a session dead — no playback, choppy playback, and consecutive drops.

use std::collections::VecDeque;

use roc_audio::FrameFlags;
use roc_shared::time::Nanos;

pub struct WatchdogConfig {
    pub no_playback_timeout: Nanos,
    pub choppy_playback_window: Nanos,
    pub choppy_playback_timeout: Nanos,
    pub choppy_fraction_threshold: f64,
    pub max_consecutive_drops: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            no_playback_timeout: 2_000_000_000,
            choppy_playback_window: 1_000_000_000,
            choppy_playback_timeout: 500_000_000,
            choppy_fraction_threshold: 0.25,
            max_consecutive_drops: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    NoPlayback,
    ChoppyPlayback,
    ConsecutiveDrops,
}

struct WindowEntry {
    at: Nanos,
    bad: bool,
}

pub struct Watchdog {
    config: WatchdogConfig,
    last_non_blank_at: Option<Nanos>,
    window: VecDeque<WindowEntry>,
    choppy_since: Option<Nanos>,
    consecutive_drops: u32,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            last_non_blank_at: None,
            window: VecDeque::new(),
            choppy_since: None,
            consecutive_drops: 0,
        }
    }

    /// Feeds one frame observed at monotonic time `now`. Returns
    /// `Some(cause)` the instant one of the three deadlines trips; the
    /// caller should drain and tear the session down.
    pub fn on_frame(&mut self, now: Nanos, flags: FrameFlags) -> Option<DeathCause> {
        let blank = flags.contains(FrameFlags::BLANK);
        let bad = flags.contains(FrameFlags::INCOMPLETE) || flags.contains(FrameFlags::DROPS);

        if !blank {
            self.last_non_blank_at = Some(now);
        } else if let Some(last) = self.last_non_blank_at {
            if now.saturating_sub(last) > self.config.no_playback_timeout {
                return Some(DeathCause::NoPlayback);
            }
        } else {
            self.last_non_blank_at = Some(now);
        }

        if flags.contains(FrameFlags::DROPS) {
            self.consecutive_drops += 1;
        } else {
            self.consecutive_drops = 0;
        }
        if self.consecutive_drops > self.config.max_consecutive_drops {
            return Some(DeathCause::ConsecutiveDrops);
        }

        self.window.push_back(WindowEntry { at: now, bad });
        while let Some(front) = self.window.front() {
            if now.saturating_sub(front.at) > self.config.choppy_playback_window {
                self.window.pop_front();
            } else {
                break;
            }
        }
        let bad_count = self.window.iter().filter(|e| e.bad).count();
        let fraction = bad_count as f64 / self.window.len().max(1) as f64;
        if fraction > self.config.choppy_fraction_threshold {
            let since = *self.choppy_since.get_or_insert(now);
            if now.saturating_sub(since) > self.config.choppy_playback_timeout {
                return Some(DeathCause::ChoppyPlayback);
            }
        } else {
            self.choppy_since = None;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_dead_on_sustained_silence() {
        let mut wd = Watchdog::new(WatchdogConfig {
            no_playback_timeout: 100,
            ..WatchdogConfig::default()
        });
        assert_eq!(wd.on_frame(0, FrameFlags::NONE), None);
        assert_eq!(wd.on_frame(50, FrameFlags::BLANK), None);
        assert_eq!(wd.on_frame(200, FrameFlags::BLANK), Some(DeathCause::NoPlayback));
    }

    #[test]
    fn single_burst_does_not_kill_session() {
        let mut wd = Watchdog::new(WatchdogConfig::default());
        for t in 0..10 {
            let flags = if t == 5 { FrameFlags::INCOMPLETE | FrameFlags::DROPS } else { FrameFlags::NONE };
            assert_eq!(wd.on_frame(t * 20_000_000, flags), None);
        }
    }

    #[test]
    fn too_many_consecutive_drops_kills_session() {
        let mut wd = Watchdog::new(WatchdogConfig {
            max_consecutive_drops: 3,
            ..WatchdogConfig::default()
        });
        for t in 0..3 {
            assert_eq!(wd.on_frame(t * 10_000_000, FrameFlags::DROPS), None);
        }
        assert_eq!(wd.on_frame(40_000_000, FrameFlags::DROPS), Some(DeathCause::ConsecutiveDrops));
    }
}
