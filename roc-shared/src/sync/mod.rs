//! Lock-free concurrency primitives (spec §5, §2 component 2).

pub mod freelist;
pub mod mpsc;
pub mod rate_limiter;
pub mod seqlock;
pub mod timer;

pub use freelist::FreeList;
pub use mpsc::MpscQueue;
pub use rate_limiter::RateLimiter;
pub use seqlock::Seqlock;
pub use timer::Timer;
