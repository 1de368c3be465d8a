//! Receiver session router (spec §4.4): demultiplexes inbound packets onto
//! per-SSRC sessions, created on demand and swept out on silence timeout.

use std::collections::HashMap;

use roc_shared::time::Nanos;

/// What a session exposes to the router's timeout sweep. Implemented by
/// whatever per-session pipeline bundle the caller builds (reorder queue +
/// FEC reader + depacketizer + watchdog + latency tuner, spec §3
/// "Session").
pub trait SessionHandle {
    fn niq_stalling(&self) -> Nanos;
}

/// Per-slot policy: whether a never-seen SSRC may open a new session.
pub trait SessionSlotPolicy {
    fn allow_new_session(&self, ssrc: u32) -> bool;
}

/// Always allows new sessions; the common case for a receiver slot with no
/// allowlist configured.
pub struct AllowAll;

impl SessionSlotPolicy for AllowAll {
    fn allow_new_session(&self, _ssrc: u32) -> bool {
        true
    }
}

pub struct SessionRouter<T: SessionHandle, P: SessionSlotPolicy, F: Fn(u32) -> T> {
    sessions: HashMap<u32, T>,
    policy: P,
    factory: F,
    no_playback_timeout: Nanos,
}

impl<T: SessionHandle, P: SessionSlotPolicy, F: Fn(u32) -> T> SessionRouter<T, P, F> {
    pub fn new(policy: P, factory: F, no_playback_timeout: Nanos) -> Self {
        Self {
            sessions: HashMap::new(),
            policy,
            factory,
            no_playback_timeout,
        }
    }

    /// Looks up (creating if permitted and absent) the session for `ssrc`.
    /// `O(1)` amortized, per spec §4.4.
    pub fn session_for(&mut self, ssrc: u32) -> Option<&mut T> {
        if !self.sessions.contains_key(&ssrc) {
            if !self.policy.allow_new_session(ssrc) {
                return None;
            }
            self.sessions.insert(ssrc, (self.factory)(ssrc));
        }
        self.sessions.get_mut(&ssrc)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, ssrc: u32) -> bool {
        self.sessions.contains_key(&ssrc)
    }

    /// All currently live SSRCs, in no particular order.
    pub fn ssrcs(&self) -> Vec<u32> {
        self.sessions.keys().copied().collect()
    }

    /// Removes every session whose `niq_stalling` exceeds
    /// `no_playback_timeout`, returning the SSRCs removed (spec §4.4: "a
    /// session whose niq_stalling exceeds no_playback_timeout is marked
    /// dead and removed at the next sweep").
    pub fn sweep_dead_sessions(&mut self) -> Vec<u32> {
        let dead: Vec<u32> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.niq_stalling() > self.no_playback_timeout)
            .map(|(&ssrc, _)| ssrc)
            .collect();
        for ssrc in &dead {
            self.sessions.remove(ssrc);
        }
        dead
    }
}
