//! Tracks bytes acquired by a pool or arena, acquiring via CAS before
//! delegating and releasing on deallocate (spec §5 "Resource policy").

use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MemoryLimiter {
    name: &'static str,
    max_bytes: usize,
    bytes_acquired: AtomicUsize,
}

impl MemoryLimiter {
    /// `max_bytes == 0` means unlimited: only tracking is performed.
    pub fn new(name: &'static str, max_bytes: usize) -> Self {
        Self {
            name,
            max_bytes,
            bytes_acquired: AtomicUsize::new(0),
        }
    }

    /// Tracks `num_bytes` as acquired. Returns `false` (without mutating
    /// state) if doing so would breach `max_bytes`.
    #[must_use]
    pub fn acquire(&self, num_bytes: usize) -> bool {
        loop {
            let current = self.bytes_acquired.load(Ordering::Acquire);
            if self.max_bytes != 0 && current + num_bytes > self.max_bytes {
                log::debug!(
                    "memory limiter {}: denying acquire of {} bytes ({}/{} in use)",
                    self.name,
                    num_bytes,
                    current,
                    self.max_bytes
                );
                return false;
            }
            if self
                .bytes_acquired
                .compare_exchange_weak(
                    current,
                    current + num_bytes,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Releases previously-acquired bytes. Panics (a programmer error, per
    /// spec §7) if releasing more than is currently tracked.
    pub fn release(&self, num_bytes: usize) {
        let prev = self.bytes_acquired.fetch_sub(num_bytes, Ordering::AcqRel);
        debug_assert!(
            prev >= num_bytes,
            "memory limiter {}: released more than acquired",
            self.name
        );
    }

    pub fn num_acquired(&self) -> usize {
        self.bytes_acquired.load(Ordering::Acquire)
    }
}

impl Drop for MemoryLimiter {
    fn drop(&mut self) {
        let remaining = self.bytes_acquired.load(Ordering::Acquire);
        debug_assert_eq!(
            remaining, 0,
            "memory limiter {} dropped with {} bytes still acquired",
            self.name, remaining
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_past_the_limit() {
        let limiter = MemoryLimiter::new("test", 100);
        assert!(limiter.acquire(60));
        assert!(!limiter.acquire(60));
        limiter.release(60);
        assert!(limiter.acquire(60));
        limiter.release(60);
    }

    #[test]
    fn zero_limit_is_unbounded() {
        let limiter = MemoryLimiter::new("test", 0);
        assert!(limiter.acquire(1 << 30));
        limiter.release(1 << 30);
    }
}
