//! Input/output device URIs (spec §6: "input/output device URIs" is the
//! only contract the core demands of its sound-I/O collaborator). Real
//! sound-card drivers are out of scope here (spec Non-goals); these demos
//! instead support a small closed scheme table covering what's needed to
//! drive the pipeline end to end: a synthetic tone, a raw-PCM file, and a
//! sink that discards output.

use std::f32::consts::PI;
use std::fs::File;
use std::io::{Read, Write};

use roc_audio::{Frame, SampleSpec};
use roc_shared::error::{Error, Result};

/// Feeds one [`Frame`] of audio per call.
pub trait AudioSource {
    fn read_frame(&mut self, frame: &mut Frame) -> Result<()>;
}

/// Consumes one [`Frame`] of audio per call.
pub trait AudioSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;
}

/// Generates a sine wave at `freq_hz`, identical on every channel.
pub struct ToneSource {
    sample_spec: SampleSpec,
    freq_hz: f32,
    phase: f32,
}

impl ToneSource {
    pub fn new(sample_spec: SampleSpec, freq_hz: f32) -> Self {
        Self { sample_spec, freq_hz, phase: 0.0 }
    }
}

impl AudioSource for ToneSource {
    fn read_frame(&mut self, frame: &mut Frame) -> Result<()> {
        let channels = self.sample_spec.num_channels();
        let step = 2.0 * PI * self.freq_hz / self.sample_spec.sample_rate as f32;
        for chunk in frame.samples_mut().chunks_mut(channels) {
            let value = self.phase.sin() * 0.25;
            for sample in chunk {
                *sample = value;
            }
            self.phase += step;
            if self.phase > 2.0 * PI {
                self.phase -= 2.0 * PI;
            }
        }
        Ok(())
    }
}

/// Reads raw interleaved `f32` little-endian PCM from a file, one frame's
/// worth at a time. Ends the stream (returns [`Error::End`]) once the file
/// is exhausted.
pub struct FileSource {
    file: File,
}

impl FileSource {
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self { file: File::open(path)? })
    }
}

impl AudioSource for FileSource {
    fn read_frame(&mut self, frame: &mut Frame) -> Result<()> {
        let samples = frame.samples_mut();
        let mut raw = vec![0u8; samples.len() * 4];
        let mut read = 0;
        while read < raw.len() {
            match self.file.read(&mut raw[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) => return Err(e.into()),
            }
        }
        if read == 0 {
            return Err(Error::End);
        }
        for (sample, bytes) in samples.iter_mut().zip(raw.chunks_exact(4)) {
            *sample = f32::from_le_bytes(bytes.try_into().unwrap());
        }
        // A short final read (fewer samples than the frame wants) leaves
        // the remainder at whatever the frame buffer already held, same as
        // a blank frame's trailing silence.
        for sample in samples[read / 4..].iter_mut() {
            *sample = 0.0;
        }
        Ok(())
    }
}

/// Appends raw interleaved `f32` little-endian PCM to a file.
pub struct FileSink {
    file: File,
}

impl FileSink {
    pub fn create(path: &str) -> Result<Self> {
        Ok(Self { file: File::create(path)? })
    }
}

impl AudioSink for FileSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mut raw = Vec::with_capacity(frame.samples().len() * 4);
        for sample in frame.samples() {
            raw.extend_from_slice(&sample.to_le_bytes());
        }
        self.file.write_all(&raw)?;
        Ok(())
    }
}

/// Discards every frame written to it.
pub struct NullSink;

impl AudioSink for NullSink {
    fn write_frame(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

/// Parses a `tone:<freq-hz>` / `file:<path>` / `null:` device URI for
/// capture, building the matching [`AudioSource`].
pub fn open_source(uri: &str, sample_spec: SampleSpec) -> Result<Box<dyn AudioSource>> {
    if let Some(freq) = uri.strip_prefix("tone:") {
        let freq_hz: f32 = freq
            .parse()
            .map_err(|_| Error::BadConfig(format!("bad tone frequency: {freq}")))?;
        return Ok(Box::new(ToneSource::new(sample_spec, freq_hz)));
    }
    if let Some(path) = uri.strip_prefix("file:") {
        return Ok(Box::new(FileSource::open(path)?));
    }
    Err(Error::BadConfig(format!("unrecognized input device uri: {uri}")))
}

/// Parses a `file:<path>` / `null:` device URI for playback, building the
/// matching [`AudioSink`].
pub fn open_sink(uri: &str) -> Result<Box<dyn AudioSink>> {
    if let Some(path) = uri.strip_prefix("file:") {
        return Ok(Box::new(FileSink::create(path)?));
    }
    if uri == "null:" {
        return Ok(Box::new(NullSink));
    }
    Err(Error::BadConfig(format!("unrecognized output device uri: {uri}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roc_audio::ChannelSet;

    #[test]
    fn tone_source_fills_every_sample() {
        let sample_spec = SampleSpec::new(44100, ChannelSet::stereo());
        let mut source = ToneSource::new(sample_spec, 440.0);
        let mut frame = Frame::new(20);
        source.read_frame(&mut frame).unwrap();
        assert!(frame.samples().iter().any(|&s| s != 0.0));
    }

    #[test]
    fn unrecognized_source_uri_is_a_config_error() {
        let sample_spec = SampleSpec::new(44100, ChannelSet::stereo());
        assert!(open_source("alsa:default", sample_spec).is_err());
    }
}
