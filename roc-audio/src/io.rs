//! Minimal frame I/O traits (spec §4.14, grounded on the original
//! `iframe_writer.h`/`iframe_reader.h`/`null_writer.h` interfaces): the seam
//! every pipeline stage that moves [`Frame`]s is built against.

use crate::frame::Frame;
use roc_shared::error::Result;

pub trait FrameWriter: Send {
    fn write(&mut self, frame: &Frame) -> Result<()>;
}

pub trait FrameReader: Send {
    fn read(&mut self, frame: &mut Frame) -> Result<()>;
}

/// Discards every frame written to it. Useful as a pipeline terminator in
/// tests and benches, matching the original's `null_writer.h`.
#[derive(Default)]
pub struct NullWriter;

impl FrameWriter for NullWriter {
    fn write(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}
