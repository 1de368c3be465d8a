//! Monotonic and wall-clock sources, and conversion between nanoseconds,
//! samples, and RTP timestamp units at a declared sample rate (spec §2.1).

use std::ops::Add;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Nanoseconds, the currency unit for every latency metric in the pipeline.
pub type Nanos = u64;

/// NTP-epoch offset in seconds between 1900-01-01 and the Unix epoch.
const NTP_UNIX_OFFSET_SECS: u64 = 0x83AA_7E80;

/// Pairs a monotonic [`Instant`] with the wall-clock offset needed to convert
/// it to NTP time, so that a single `now()` sample can serve both the
/// monotonic deadlines used by the sync primitives and the NTP timestamps
/// RTCP Sender Reports require.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SystemInstant {
    instant: Instant,
    duration_since_unix_epoch: Duration,
}

impl SystemInstant {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            duration_since_unix_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0)),
        }
    }

    pub fn duration_since_unix_epoch(&self, now: Instant) -> Duration {
        now.duration_since(self.instant)
            .add(self.duration_since_unix_epoch)
    }

    /// 64-bit NTP timestamp (RFC 5905 format) for a given monotonic instant.
    pub fn ntp(&self, now: Instant) -> u64 {
        unix_nanos_to_ntp(self.duration_since_unix_epoch(now).as_nanos() as u64)
    }

    /// Inverse of [`SystemInstant::ntp`]: recover a monotonic [`Instant`]
    /// that a remote NTP timestamp corresponds to, relative to this clock.
    pub fn instant_for_ntp(&self, ntp: u64) -> Instant {
        let unix_nanos = ntp_to_unix_nanos(ntp);
        let unix = Duration::new(unix_nanos / 1_000_000_000, (unix_nanos % 1_000_000_000) as u32);
        self.instant + unix - self.duration_since_unix_epoch
    }
}

fn unix_nanos_to_ntp(u: u64) -> u64 {
    let mut s = u / 1_000_000_000;
    s += NTP_UNIX_OFFSET_SECS;
    let mut f = u % 1_000_000_000;
    f <<= 32;
    f /= 1_000_000_000;
    s <<= 32;
    s | f
}

fn ntp_to_unix_nanos(t: u64) -> u64 {
    let mut s = t >> 32;
    let mut f = t & 0xFFFF_FFFF;
    f *= 1_000_000_000;
    f >>= 32;
    s = s.saturating_sub(NTP_UNIX_OFFSET_SECS);
    s * 1_000_000_000 + f
}

/// Converts a duration in nanoseconds to a sample count at `sample_rate` Hz,
/// rounding to the nearest sample.
pub fn ns_to_samples(ns: Nanos, sample_rate: u32) -> u64 {
    (ns as u128 * sample_rate as u128 / 1_000_000_000u128) as u64
}

/// Converts a sample count at `sample_rate` Hz to a duration in nanoseconds.
pub fn samples_to_ns(samples: u64, sample_rate: u32) -> Nanos {
    (samples as u128 * 1_000_000_000u128 / sample_rate as u128) as Nanos
}

/// Converts a sample count to RTP timestamp units, which for every payload
/// type this toolkit supports are one-to-one with samples (per stream
/// channel) at the stream's declared clock rate.
pub fn samples_to_rtp_ts(samples: u64) -> u32 {
    samples as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntp_roundtrip_is_close() {
        let clock = SystemInstant::now();
        let now = Instant::now();
        let ntp = clock.ntp(now);
        let recovered = clock.instant_for_ntp(ntp);
        let diff = if recovered > now {
            recovered - now
        } else {
            now - recovered
        };
        assert!(diff < Duration::from_micros(1));
    }

    #[test]
    fn ns_samples_roundtrip() {
        let ns = 10_000_000; // 10ms
        let samples = ns_to_samples(ns, 44100);
        assert_eq!(samples, 441);
        assert_eq!(samples_to_ns(441, 44100), 9_999_999);
    }
}
