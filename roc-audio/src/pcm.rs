//! PCM subformat conversion (spec §4.13 "PCM mapper").
//!
//! At least one side of any conversion must be [`PcmSubformat::Raw`] (native
//! `f32`); to convert between two non-raw formats, compose two mappers
//! through `Raw` — matching the original implementation's own restriction
//! ("to reduce code size, we generate converters only between raw and
//! non-raw formats").
//!
//! Scope decision (recorded in DESIGN.md): widths that are not a multiple of
//! 8 bits (18-bit, 20-bit) are only supported in their "padded-in-32" form —
//! stored right-justified in a 4-byte container — not truly bit-packed
//! across byte boundaries. True sub-byte packing is rare in practice and
//! its bit-cursor arithmetic was judged not worth the complexity budget.

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use roc_shared::error::{Error, Result};

pub type Sample = f32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
    Native,
}

/// A concrete PCM wire/in-memory representation (spec §3, §4.13).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PcmSubformat {
    /// Native `f32`, the pipeline's internal currency.
    Raw,
    /// Signed or unsigned integer PCM. `width` is the meaningful bit width
    /// (8/16/18/20/24/32/64); `container_bits` is the storage width in bits
    /// (equal to `width` for byte-aligned widths, 32 for the padded 18/20
    /// bit variants).
    Int {
        width: u8,
        container_bits: u8,
        signed: bool,
        endian: Endian,
    },
    /// IEEE-754 float, explicitly not the internal `Raw` representation
    /// (e.g. a little-endian float payload received off the wire).
    Float { bits: u8, endian: Endian },
}

impl PcmSubformat {
    pub fn int(width: u8, signed: bool, endian: Endian) -> Self {
        let container_bits = if width % 8 == 0 { width } else { 32 };
        PcmSubformat::Int {
            width,
            container_bits,
            signed,
            endian,
        }
    }

    pub fn container_bytes(&self) -> usize {
        match self {
            PcmSubformat::Raw => std::mem::size_of::<Sample>(),
            PcmSubformat::Int { container_bits, .. } => *container_bits as usize / 8,
            PcmSubformat::Float { bits, .. } => *bits as usize / 8,
        }
    }
}

/// Converts between two PCM subformats, one of which must be [`PcmSubformat::Raw`].
pub struct PcmMapper {
    input: PcmSubformat,
    output: PcmSubformat,
}

impl PcmMapper {
    pub fn new(input: PcmSubformat, output: PcmSubformat) -> Result<Self> {
        if input != PcmSubformat::Raw && output != PcmSubformat::Raw {
            return Err(Error::BadConfig(
                "pcm mapper: either input or output format must be raw".into(),
            ));
        }
        Ok(Self { input, output })
    }

    pub fn input_format(&self) -> PcmSubformat {
        self.input
    }

    pub fn output_format(&self) -> PcmSubformat {
        self.output
    }

    /// Number of input samples representable in `input_bytes`.
    pub fn input_sample_count(&self, input_bytes: usize) -> usize {
        input_bytes / self.input.container_bytes()
    }

    pub fn output_byte_count(&self, n_samples: usize) -> usize {
        n_samples * self.output.container_bytes()
    }

    /// Maps `n_samples` total (across all channels, interleaved) from
    /// `input` to `output`, returning the number of samples actually mapped
    /// (truncated if either buffer is too small).
    pub fn map(&self, input: &[u8], output: &mut [u8], n_samples: usize) -> usize {
        let in_bytes = self.input.container_bytes();
        let out_bytes = self.output.container_bytes();
        let n = n_samples
            .min(input.len() / in_bytes.max(1))
            .min(output.len() / out_bytes.max(1));
        for i in 0..n {
            let raw = decode_sample(self.input, &input[i * in_bytes..(i + 1) * in_bytes]);
            encode_sample(self.output, raw, &mut output[i * out_bytes..(i + 1) * out_bytes]);
        }
        n
    }
}

fn decode_sample(fmt: PcmSubformat, bytes: &[u8]) -> Sample {
    match fmt {
        PcmSubformat::Raw => read_native_f32(bytes),
        PcmSubformat::Float { bits, endian } => match bits {
            32 => match endian {
                Endian::Big => BigEndian::read_f32(bytes),
                Endian::Little => LittleEndian::read_f32(bytes),
                Endian::Native => NativeEndian::read_f32(bytes),
            },
            64 => (match endian {
                Endian::Big => BigEndian::read_f64(bytes),
                Endian::Little => LittleEndian::read_f64(bytes),
                Endian::Native => NativeEndian::read_f64(bytes),
            }) as f32,
            _ => 0.0,
        },
        PcmSubformat::Int {
            width,
            container_bits,
            signed,
            endian,
        } => {
            let raw_uint = read_uint(bytes, container_bits, endian);
            int_to_sample(raw_uint, width, signed)
        }
    }
}

fn encode_sample(fmt: PcmSubformat, value: Sample, bytes: &mut [u8]) {
    match fmt {
        PcmSubformat::Raw => write_native_f32(bytes, value),
        PcmSubformat::Float { bits, endian } => match bits {
            32 => match endian {
                Endian::Big => BigEndian::write_f32(bytes, value),
                Endian::Little => LittleEndian::write_f32(bytes, value),
                Endian::Native => NativeEndian::write_f32(bytes, value),
            },
            64 => match endian {
                Endian::Big => BigEndian::write_f64(bytes, value as f64),
                Endian::Little => LittleEndian::write_f64(bytes, value as f64),
                Endian::Native => NativeEndian::write_f64(bytes, value as f64),
            },
            _ => {}
        },
        PcmSubformat::Int {
            width,
            container_bits,
            signed,
            endian,
        } => {
            let raw_uint = sample_to_int(value, width, signed);
            write_uint(bytes, container_bits, endian, raw_uint);
        }
    }
}

fn read_native_f32(bytes: &[u8]) -> Sample {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    f32::from_ne_bytes(buf)
}

fn write_native_f32(bytes: &mut [u8], value: Sample) {
    bytes[..4].copy_from_slice(&value.to_ne_bytes());
}

fn read_uint(bytes: &[u8], container_bits: u8, endian: Endian) -> u64 {
    let n = (container_bits as usize / 8).min(8);
    let mut buf = [0u8; 8];
    match endian {
        Endian::Big => buf[8 - n..].copy_from_slice(&bytes[..n]),
        Endian::Little | Endian::Native => buf[..n].copy_from_slice(&bytes[..n]),
    }
    match endian {
        Endian::Big => u64::from_be_bytes(buf),
        Endian::Little => u64::from_le_bytes(buf),
        Endian::Native => {
            if cfg!(target_endian = "big") {
                u64::from_be_bytes(buf)
            } else {
                u64::from_le_bytes(buf)
            }
        }
    }
}

fn write_uint(bytes: &mut [u8], container_bits: u8, endian: Endian, value: u64) {
    let n = (container_bits as usize / 8).min(8);
    let full = match endian {
        Endian::Big => value.to_be_bytes(),
        Endian::Little => value.to_le_bytes(),
        Endian::Native => {
            if cfg!(target_endian = "big") {
                value.to_be_bytes()
            } else {
                value.to_le_bytes()
            }
        }
    };
    match endian {
        Endian::Big => bytes[..n].copy_from_slice(&full[8 - n..]),
        Endian::Little | Endian::Native => bytes[..n].copy_from_slice(&full[..n]),
    }
}

/// Converts a raw-justified unsigned container value holding a `width`-bit
/// sample into a normalized `[-1.0, 1.0]` float, saturating is not needed
/// here (widening conversion never overflows).
fn int_to_sample(raw: u64, width: u8, signed: bool) -> Sample {
    let max_positive = (1i64 << (width - 1)) - 1;
    if signed {
        let sign_bit = 1u64 << (width - 1);
        let masked = raw & ((1u64 << width) - 1);
        let signed_value = if masked & sign_bit != 0 {
            (masked as i64) - (1i64 << width)
        } else {
            masked as i64
        };
        signed_value as Sample / max_positive as Sample
    } else {
        let bias = 1i64 << (width - 1);
        let unsigned_value = (raw & ((1u64 << width) - 1)) as i64 - bias;
        unsigned_value as Sample / max_positive as Sample
    }
}

/// Inverse of [`int_to_sample`]. Saturates on narrowing conversions (spec
/// §4.13).
fn sample_to_int(value: Sample, width: u8, signed: bool) -> u64 {
    let max_positive = (1i64 << (width - 1)) - 1;
    let min_negative = -(1i64 << (width - 1));
    let scaled = (value as f64 * max_positive as f64).round();
    let clamped = scaled.clamp(min_negative as f64, max_positive as f64) as i64;
    if signed {
        (clamped as u64) & ((1u64 << width) - 1)
    } else {
        let bias = 1i64 << (width - 1);
        ((clamped + bias) as u64) & ((1u64 << width) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s16_roundtrip_within_one_lsb() {
        let mapper_to = PcmMapper::new(PcmSubformat::Raw, PcmSubformat::int(16, true, Endian::Little)).unwrap();
        let mapper_from = PcmMapper::new(PcmSubformat::int(16, true, Endian::Little), PcmSubformat::Raw).unwrap();

        let original: Vec<Sample> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.123456];
        let mut raw_in = vec![0u8; original.len() * 4];
        for (i, s) in original.iter().enumerate() {
            raw_in[i * 4..i * 4 + 4].copy_from_slice(&s.to_ne_bytes());
        }
        let mut encoded = vec![0u8; original.len() * 2];
        mapper_to.map(&raw_in, &mut encoded, original.len());

        let mut decoded_raw = vec![0u8; original.len() * 4];
        mapper_from.map(&encoded, &mut decoded_raw, original.len());

        for (i, s) in original.iter().enumerate() {
            let got = f32::from_ne_bytes(decoded_raw[i * 4..i * 4 + 4].try_into().unwrap());
            assert!((got - s).abs() <= 1.0 / 32767.0 + 1e-6, "{} vs {}", got, s);
        }
    }

    #[test]
    fn narrowing_saturates() {
        assert_eq!(sample_to_int(2.0, 16, true), 32767);
        assert_eq!(sample_to_int(-2.0, 16, true), (-32768i64 as u64) & 0xFFFF);
    }

    #[test]
    fn requires_one_side_raw() {
        let bad = PcmMapper::new(
            PcmSubformat::int(16, true, Endian::Little),
            PcmSubformat::int(8, false, Endian::Little),
        );
        assert!(bad.is_err());
    }
}
