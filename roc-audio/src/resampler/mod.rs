//! Fractional-rate resampling (spec §4.10 "Resampler").
//!
//! [`Reader`] and [`Writer`] adapt a [`SincResampler`] onto the
//! [`crate::io::FrameReader`]/[`crate::io::FrameWriter`] seam, so a
//! resampler can be spliced into a pipeline like any other stage.

mod sinc;

use crate::frame::Frame;
use crate::io::{FrameReader, FrameWriter};
use crate::sample_spec::SampleSpec;
use roc_shared::error::{Error, Result};
pub use sinc::SincResampler;

const READ_CHUNK_FRAMES: usize = 256;

/// Wraps an upstream [`FrameReader`], resampling its output from
/// `input_spec.sample_rate` to `output_spec.sample_rate`.
pub struct Reader<R: FrameReader> {
    inner: R,
    core: SincResampler,
    n_channels: usize,
    input_frame: Frame,
    exhausted: bool,
}

impl<R: FrameReader> Reader<R> {
    pub fn new(inner: R, input_spec: SampleSpec, output_spec: SampleSpec) -> Result<Self> {
        if input_spec.num_channels() != output_spec.num_channels() {
            return Err(Error::BadConfig(
                "resampler: input/output channel counts must match".into(),
            ));
        }
        let n_channels = input_spec.num_channels().max(1);
        let mut core = SincResampler::new(n_channels);
        core.set_scaling(input_spec.sample_rate, output_spec.sample_rate, 1.0);
        Ok(Self {
            inner,
            core,
            n_channels,
            input_frame: Frame::new(READ_CHUNK_FRAMES * n_channels),
            exhausted: false,
        })
    }

    /// Adjusts the instantaneous scaling ratio without interrupting
    /// continuity, per spec §4.10's clock-drift-compensation requirement.
    pub fn set_scaling(&mut self, in_rate: u32, out_rate: u32, multiplier: f64) {
        self.core.set_scaling(in_rate, out_rate, multiplier);
    }

    fn refill(&mut self) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        match self.inner.read(&mut self.input_frame) {
            Ok(()) => {
                self.core.push_input(self.input_frame.samples());
                Ok(())
            }
            Err(Error::End) => {
                self.exhausted = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl<R: FrameReader> FrameReader for Reader<R> {
    fn read(&mut self, frame: &mut Frame) -> Result<()> {
        let n_out_frames = frame.num_samples() / self.n_channels;
        let mut produced = 0;
        while produced < n_out_frames {
            let out_slice = &mut frame.samples_mut()[produced * self.n_channels..];
            let got = self.core.produce(out_slice);
            produced += got;
            if produced >= n_out_frames {
                break;
            }
            if self.exhausted {
                break;
            }
            self.refill()?;
        }
        if produced == 0 && self.exhausted {
            return Err(Error::End);
        }
        Ok(())
    }
}

/// Wraps a downstream [`FrameWriter`], resampling from `input_spec` to
/// `output_spec` before forwarding.
pub struct Writer<W: FrameWriter> {
    inner: W,
    core: SincResampler,
    n_channels: usize,
    out_scratch: Vec<f32>,
}

impl<W: FrameWriter> Writer<W> {
    pub fn new(inner: W, input_spec: SampleSpec, output_spec: SampleSpec) -> Result<Self> {
        if input_spec.num_channels() != output_spec.num_channels() {
            return Err(Error::BadConfig(
                "resampler: input/output channel counts must match".into(),
            ));
        }
        let n_channels = input_spec.num_channels().max(1);
        let mut core = SincResampler::new(n_channels);
        core.set_scaling(input_spec.sample_rate, output_spec.sample_rate, 1.0);
        Ok(Self {
            inner,
            core,
            n_channels,
            out_scratch: vec![0.0; READ_CHUNK_FRAMES * n_channels],
        })
    }

    pub fn set_scaling(&mut self, in_rate: u32, out_rate: u32, multiplier: f64) {
        self.core.set_scaling(in_rate, out_rate, multiplier);
    }
}

impl<W: FrameWriter> FrameWriter for Writer<W> {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.core.push_input(frame.samples());
        loop {
            let got = self.core.produce(&mut self.out_scratch);
            if got == 0 {
                break;
            }
            let out_frame = Frame::from_samples(self.out_scratch[..got * self.n_channels].to_vec());
            self.inner.write(&out_frame)?;
        }
        Ok(())
    }
}
