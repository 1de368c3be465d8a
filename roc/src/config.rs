//! Endpoint set configuration (spec §6): typed option struct with the same
//! `deduce_defaults()` shape every other config struct in this toolkit
//! uses (spec §4.9, §6 "Environment & persisted state").

use roc_audio::SampleSpec;
use roc_ctl::TunerBackend;
use roc_packet::FecScheme;
use roc_shared::error::{Error, Result};
use roc_shared::time::Nanos;

use crate::uri::{parse, EndpointUri, Interface};

const DEFAULT_TARGET_LATENCY: Nanos = 200_000_000;
const DEFAULT_PACKET_LENGTH: Nanos = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecConfig {
    ReedSolomon8m { n: u16, m: u16 },
    LdpcStaircase { n: u16, m: u16 },
}

impl FecConfig {
    pub fn scheme(&self) -> FecScheme {
        match self {
            FecConfig::ReedSolomon8m { .. } => FecScheme::ReedSolomon8m,
            FecConfig::LdpcStaircase { .. } => FecScheme::LdpcStaircase,
        }
    }

    pub fn n(&self) -> u16 {
        match self {
            FecConfig::ReedSolomon8m { n, .. } | FecConfig::LdpcStaircase { n, .. } => *n,
        }
    }

    pub fn m(&self) -> u16 {
        match self {
            FecConfig::ReedSolomon8m { m, .. } | FecConfig::LdpcStaircase { m, .. } => *m,
        }
    }
}

/// A sender or receiver endpoint set: one `AudioSource`, optionally one
/// matching `AudioRepair`, optionally one `AudioControl` (spec §6).
#[derive(Debug, Clone)]
pub struct EndpointSetConfig {
    pub source: EndpointUri,
    pub repair: Option<EndpointUri>,
    pub control: Option<EndpointUri>,
    pub sample_spec: SampleSpec,
    pub payload_type: u8,
    pub packet_length: Nanos,
    pub fec: Option<FecConfig>,
    pub target_latency: Nanos,
    pub tuner_backend: TunerBackend,
}

impl EndpointSetConfig {
    /// Parses `source_uri`/`repair_uri`/`control_uri` and validates the
    /// completeness rule (spec §6: "complete when at least the AudioSource
    /// endpoint is present and, if a FEC scheme is chosen, the matching
    /// AudioRepair is also present"). `fec` must be `None` exactly when
    /// `source_uri`'s scheme carries no FEC scheme.
    pub fn new(
        source_uri: &str,
        repair_uri: Option<&str>,
        control_uri: Option<&str>,
        sample_spec: SampleSpec,
        payload_type: u8,
        fec: Option<FecConfig>,
    ) -> Result<Self> {
        let source = parse(source_uri)?;
        let source_fec = match source.interface {
            Interface::AudioSource(scheme) => scheme,
            _ => return Err(Error::BadConfig("source endpoint must use an AudioSource scheme".into())),
        };

        let repair = repair_uri.map(parse).transpose()?;
        let control = control_uri.map(parse).transpose()?;

        match (source_fec, &repair, &fec) {
            (None, None, None) => {}
            (Some(scheme), Some(repair), Some(fec)) => {
                let repair_scheme = match repair.interface {
                    Interface::AudioRepair(s) => s,
                    _ => return Err(Error::BadConfig("repair endpoint must use an AudioRepair scheme".into())),
                };
                if repair_scheme != scheme || fec.scheme() != scheme {
                    return Err(Error::BadConfig(
                        "source, repair endpoint and fec config must name the same scheme".into(),
                    ));
                }
            }
            _ => {
                return Err(Error::BadConfig(
                    "a FEC-carrying source scheme requires a matching repair endpoint and fec config".into(),
                ))
            }
        }

        if let Some(control) = &control {
            if control.interface != Interface::AudioControl {
                return Err(Error::BadConfig("control endpoint must use the rtcp scheme".into()));
            }
        }

        Ok(Self {
            source,
            repair,
            control,
            sample_spec,
            payload_type,
            packet_length: 0,
            fec,
            target_latency: 0,
            tuner_backend: TunerBackend::Niq,
        })
    }

    /// Fills `0`-valued fields (spec §6: "each struct defines defaults and a
    /// `deduce_defaults()` step").
    pub fn deduce_defaults(mut self) -> Self {
        if self.packet_length == 0 {
            self.packet_length = DEFAULT_PACKET_LENGTH;
        }
        if self.target_latency == 0 {
            self.target_latency = DEFAULT_TARGET_LATENCY;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roc_audio::ChannelSet;

    #[test]
    fn plain_rtp_source_needs_no_repair() {
        let cfg = EndpointSetConfig::new(
            "rtp://127.0.0.1:10001",
            None,
            None,
            SampleSpec::new(44100, ChannelSet::stereo()),
            10,
            None,
        )
        .unwrap();
        assert!(cfg.repair.is_none());
    }

    #[test]
    fn fec_source_requires_matching_repair() {
        let err = EndpointSetConfig::new(
            "rtp+rs8m://127.0.0.1:10001",
            None,
            None,
            SampleSpec::new(44100, ChannelSet::stereo()),
            10,
            Some(FecConfig::ReedSolomon8m { n: 10, m: 5 }),
        );
        assert!(err.is_err());
    }

    #[test]
    fn fec_source_accepts_matching_repair() {
        let cfg = EndpointSetConfig::new(
            "rtp+rs8m://127.0.0.1:10001",
            Some("rs8m://127.0.0.1:10002"),
            None,
            SampleSpec::new(44100, ChannelSet::stereo()),
            10,
            Some(FecConfig::ReedSolomon8m { n: 10, m: 5 }),
        )
        .unwrap();
        assert!(cfg.repair.is_some());
    }

    #[test]
    fn deduce_defaults_fills_zero_fields() {
        let cfg = EndpointSetConfig::new(
            "rtp://127.0.0.1:10001",
            None,
            None,
            SampleSpec::new(44100, ChannelSet::stereo()),
            10,
            None,
        )
        .unwrap()
        .deduce_defaults();
        assert_eq!(cfg.packet_length, DEFAULT_PACKET_LENGTH);
        assert_eq!(cfg.target_latency, DEFAULT_TARGET_LATENCY);
    }
}
