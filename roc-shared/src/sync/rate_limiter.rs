//! A timestamp-and-period limiter: `allow()` succeeds once the elapsed time
//! since the last success exceeds the period (spec §5). Used to pace the
//! RTCP communicator's periodic report builds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Sentinel `last_allowed_ns` meaning "never yet" — lets the very first
/// `allow()`/`would_allow()` succeed unconditionally instead of requiring a
/// full period to elapse since construction.
const NEVER: u64 = u64::MAX;

pub struct RateLimiter {
    period_ns: u64,
    epoch: Instant,
    last_allowed_ns: AtomicU64,
}

impl RateLimiter {
    pub fn new(period: std::time::Duration) -> Self {
        Self {
            period_ns: period.as_nanos() as u64,
            epoch: Instant::now(),
            last_allowed_ns: AtomicU64::new(NEVER),
        }
    }

    /// Non-mutating check of whether `allow()` would currently succeed.
    pub fn would_allow(&self) -> bool {
        let last = self.last_allowed_ns.load(Ordering::Acquire);
        if last == NEVER {
            return true;
        }
        let now_ns = self.epoch.elapsed().as_nanos() as u64;
        now_ns.saturating_sub(last) >= self.period_ns
    }

    /// Atomically checks and, if allowed, marks the event as having
    /// occurred now. Safe to call from multiple threads; exactly one caller
    /// observes `true` per period.
    pub fn allow(&self) -> bool {
        let now_ns = self.epoch.elapsed().as_nanos() as u64;
        loop {
            let last = self.last_allowed_ns.load(Ordering::Acquire);
            if last != NEVER && now_ns.saturating_sub(last) < self.period_ns {
                return false;
            }
            if self
                .last_allowed_ns
                .compare_exchange_weak(last, now_ns, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn denies_until_period_elapses() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        assert!(limiter.allow());
        assert!(!limiter.allow());
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.allow());
    }
}
