//! Raw-byte transport for the RTCP control channel (spec §4.12, §6
//! "AudioControl"): the seam an `AudioControl` endpoint is wired through.
//! RTCP compound packets never enter the `Packet` tagged-union model this
//! toolkit uses for RTP/FEC (spec §3), so this is a separate, narrower
//! trait than [`roc_packet::PacketSink`]/[`roc_packet::PacketSource`] —
//! whole datagrams in, whole datagrams out.

use bytes::Bytes;
use roc_shared::error::Result;

pub trait ControlTransport {
    fn send(&mut self, datagram: Bytes) -> Result<()>;

    /// Returns the next inbound datagram, or `None` if none is available
    /// right now (a non-blocking transport's "would block").
    fn recv(&mut self) -> Result<Option<Bytes>>;
}

impl ControlTransport for Box<dyn ControlTransport> {
    fn send(&mut self, datagram: Bytes) -> Result<()> {
        (**self).send(datagram)
    }

    fn recv(&mut self) -> Result<Option<Bytes>> {
        (**self).recv()
    }
}

pub mod testutil {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One end of an in-process FIFO standing in for a control-channel
    /// socket. `send` on one end shows up in `recv` on the other.
    #[derive(Clone)]
    pub struct QueueTransport {
        outbox: Arc<Mutex<VecDeque<Bytes>>>,
        inbox: Arc<Mutex<VecDeque<Bytes>>>,
    }

    impl QueueTransport {
        /// Builds two ends of one shared pair of queues: `a`'s sends land in
        /// `b`'s receives and vice versa.
        pub fn pair() -> (Self, Self) {
            let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
            let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
            let a = Self { outbox: a_to_b.clone(), inbox: b_to_a.clone() };
            let b = Self { outbox: b_to_a, inbox: a_to_b };
            (a, b)
        }
    }

    impl ControlTransport for QueueTransport {
        fn send(&mut self, datagram: Bytes) -> Result<()> {
            self.outbox.lock().unwrap().push_back(datagram);
            Ok(())
        }

        fn recv(&mut self) -> Result<Option<Bytes>> {
            Ok(self.inbox.lock().unwrap().pop_front())
        }
    }
}
