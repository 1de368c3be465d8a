//! Cancellable deadline wait, the control thread's only suspension point
//! besides the RTCP socket read (spec §5 "Suspension points", "Cancellation
//! & timeouts").
//!
//! The deadline is published through a [`Seqlock`] so any thread may move it
//! earlier (never later) and wake the waiter; a `Condvar` stands in for the
//! native semaphore the original implementation posts through, coalesced via
//! an atomic flag so concurrent `set_deadline` calls cost at most one
//! `notify`.

use super::seqlock::Seqlock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Sentinel deadline meaning "never wake until changed again."
pub const NEVER: i64 = i64::MIN;

pub struct Timer {
    deadline_ns: Seqlock<i64>,
    epoch: Instant,
    pending_wake: AtomicBool,
    gate: Mutex<()>,
    cv: Condvar,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            deadline_ns: Seqlock::new(NEVER),
            epoch: Instant::now(),
            pending_wake: AtomicBool::new(false),
            gate: Mutex::new(()),
            cv: Condvar::new(),
        }
    }

    /// Moves the deadline. May be called concurrently from any thread;
    /// always wakes a waiter if the new deadline is sooner than what it was
    /// waiting on.
    pub fn set_deadline(&self, deadline_ns: i64) {
        self.deadline_ns.store(deadline_ns);
        if !self.pending_wake.swap(true, Ordering::AcqRel) {
            let _guard = self.gate.lock().unwrap();
            self.cv.notify_all();
        }
    }

    /// Blocks the calling thread (intended to be called from a single
    /// thread, serialized with itself) until the current deadline expires or
    /// is moved to `NEVER`'s complement (i.e. any finite value in the past).
    pub fn wait_deadline(&self) {
        loop {
            let deadline_ns = self.deadline_ns.load();
            if deadline_ns == NEVER {
                let guard = self.gate.lock().unwrap();
                let _unused = self.cv.wait(guard).unwrap();
                self.pending_wake.store(false, Ordering::Release);
                continue;
            }
            let now_ns = self.epoch.elapsed().as_nanos() as i64;
            let remaining = deadline_ns - now_ns;
            if remaining <= 0 {
                self.pending_wake.store(false, Ordering::Release);
                return;
            }
            let guard = self.gate.lock().unwrap();
            let (_guard, _timeout) = self
                .cv
                .wait_timeout(guard, Duration::from_nanos(remaining as u64))
                .unwrap();
            self.pending_wake.store(false, Ordering::Release);
            if self.deadline_ns.load() <= self.epoch.elapsed().as_nanos() as i64 {
                return;
            }
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
