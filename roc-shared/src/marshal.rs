//! Wire (de)serialization traits shared by `roc-rtp` and `roc-rtcp`.
//!
//! The teacher workspace's own `rtc-rtcp`/`rtc-rtp` crates reference a
//! `shared::marshal::{Marshal, MarshalSize, Unmarshal}` trio (visible in
//! `rtc-rtcp/benches/bench.rs`) whose implementation was not present in the
//! snapshot; this module reconstructs that surface.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Types that know their own encoded wire size.
pub trait MarshalSize {
    fn marshal_size(&self) -> usize;
}

/// Types that can serialize themselves into a caller-supplied buffer.
pub trait Marshal: MarshalSize {
    /// Writes the wire encoding into `buf`, returning the number of bytes
    /// written. Fails with [`Error::BadBuffer`] if `buf` is shorter than
    /// `self.marshal_size()`.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize>;

    /// Convenience wrapper allocating a fresh buffer of exactly the right
    /// size.
    fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.marshal_size());
        let n = self.marshal_to(&mut buf)?;
        buf.truncate(n);
        Ok(buf.freeze())
    }
}

/// Types that can parse themselves out of a cursor over wire bytes.
pub trait Unmarshal: Sized {
    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self>;
}

pub(crate) fn require(buf_len: usize, needed: usize) -> Result<()> {
    if buf_len < needed {
        Err(Error::BadBuffer)
    } else {
        Ok(())
    }
}

/// Helper used by composers that write a big-endian `u16` length-prefixed
/// field count, matching RTCP/RTP's preference for big-endian wire integers
/// (spec §6).
pub(crate) fn put_padded(buf: &mut BytesMut, payload: &[u8]) {
    buf.put_slice(payload);
    let pad = (4 - (payload.len() % 4)) % 4;
    for _ in 0..pad {
        buf.put_u8(0);
    }
}
