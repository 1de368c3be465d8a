use std::io;
use thiserror::Error;

/// The result type used throughout every `roc-*` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Status taxonomy for the audio pipeline hot path (spec §7).
///
/// Hot-path stages return one of these instead of panicking or unwinding;
/// only the top-of-pipeline pump converts a non-`Ok`-equivalent status into a
/// user-visible outcome. A lost or late packet is *not* an error: it never
/// surfaces through this type, it becomes a frame flag instead.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A pool or memory limiter has no capacity left for this allocation.
    #[error("no memory available")]
    NoMem,

    /// A typed configuration struct failed `deduce_defaults()` validation.
    #[error("bad configuration: {0}")]
    BadConfig(String),

    /// A packet failed to parse (malformed RTP/RTCP/FEC header or truncated
    /// payload).
    #[error("malformed buffer")]
    BadBuffer,

    /// A packet arrived on a route/protocol it does not belong to.
    #[error("bad protocol")]
    BadProtocol,

    /// No route/session matches this packet.
    #[error("no route")]
    NoRoute,

    /// A call arrived out of the owning state machine's allowed order.
    #[error("operation not allowed in current state")]
    BadOperation,

    /// Upstream has finished; the stage should drain and propagate.
    #[error("upstream drained")]
    Drained,

    /// Non-blocking call would have blocked; retry later.
    #[error("would block, retry")]
    Again,

    /// The operation was cancelled.
    #[error("aborted")]
    Aborted,

    /// Clean shutdown in progress.
    #[error("end of stream")]
    End,

    /// Wraps a lower-level I/O failure (UDP socket errors reaching the
    /// pipeline boundary).
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl Error {
    /// True for statuses that represent routine, recoverable pipeline
    /// conditions rather than programmer or configuration mistakes.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Drained | Error::Again | Error::Aborted | Error::End
        )
    }
}
