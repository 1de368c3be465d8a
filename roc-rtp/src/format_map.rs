//! Maps an RTP payload type to the sample spec and wire codec used to
//! decode/encode its payload (spec §6 "closed set of payload types").

use roc_audio::{ChannelSet, Endian, PcmSubformat, SampleSpec};

pub const PT_L16_STEREO: u8 = 10;
pub const PT_L16_MONO: u8 = 11;
/// Dynamic raw-float payload types start at 96, inclusive, through 127.
pub const PT_RAW_FLOAT_BASE: u8 = 96;
pub const PT_RAW_FLOAT_MAX: u8 = 127;

const L16_RATE: u32 = 44100;

/// A payload type's declared sample spec, independent of any particular
/// session's negotiated rate (the L16 types fix a clock rate; dynamic
/// raw-float types carry theirs out of band and are filled in by the
/// caller).
#[derive(Debug, Clone, Copy)]
pub struct PayloadFormat {
    pub payload_type: u8,
    pub spec: SampleSpec,
}

/// Looks up the fixed-rate static payload types; returns `None` for dynamic
/// types (96-127), whose spec must come from out-of-band negotiation.
pub fn lookup_static(payload_type: u8) -> Option<PayloadFormat> {
    match payload_type {
        PT_L16_MONO => Some(PayloadFormat {
            payload_type,
            spec: SampleSpec::new(L16_RATE, ChannelSet::mono())
                .with_subformat(PcmSubformat::int(16, true, Endian::Big)),
        }),
        PT_L16_STEREO => Some(PayloadFormat {
            payload_type,
            spec: SampleSpec::new(L16_RATE, ChannelSet::stereo())
                .with_subformat(PcmSubformat::int(16, true, Endian::Big)),
        }),
        _ => None,
    }
}

pub fn is_dynamic_raw_float(payload_type: u8) -> bool {
    (PT_RAW_FLOAT_BASE..=PT_RAW_FLOAT_MAX).contains(&payload_type)
}

/// Builds a dynamic raw-float payload format for a negotiated `spec`.
pub fn raw_float_format(payload_type: u8, rate: u32, channels: ChannelSet) -> Option<PayloadFormat> {
    if !is_dynamic_raw_float(payload_type) {
        return None;
    }
    Some(PayloadFormat {
        payload_type,
        spec: SampleSpec::new(rate, channels).with_subformat(PcmSubformat::Float {
            bits: 32,
            endian: Endian::Big,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_types_resolve() {
        assert!(lookup_static(PT_L16_MONO).is_some());
        assert!(lookup_static(PT_L16_STEREO).is_some());
        assert!(lookup_static(96).is_none());
    }

    #[test]
    fn dynamic_range_is_96_to_127() {
        assert!(is_dynamic_raw_float(96));
        assert!(is_dynamic_raw_float(127));
        assert!(!is_dynamic_raw_float(95));
        assert!(!is_dynamic_raw_float(128));
    }
}
