//! Endpoint URI scheme (spec §6): each scheme names the interface an
//! endpoint plays (`AudioSource`, `AudioRepair`, `AudioControl`, session
//! control) and, for the FEC-carrying schemes, the scheme the matching
//! repair stream must use.

use roc_packet::FecScheme;
use roc_shared::error::{Error, Result};
use url::Url;

/// What role an endpoint plays in an [`crate::endpoint_set::EndpointSet`]
/// (spec §6 "Endpoint protocols").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    AudioSource(Option<FecScheme>),
    AudioRepair(FecScheme),
    AudioControl,
    SessionControl,
}

const RTSP_DEFAULT_PORT: u16 = 554;

/// A parsed endpoint address: the scheme's interface/FEC-scheme pair plus
/// the host and port to bind or connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUri {
    pub interface: Interface,
    pub host: String,
    pub port: u16,
}

/// Parses an endpoint URI string against the closed scheme table (spec §6).
/// Unlike a generic `url` parse, an unrecognized scheme or a scheme missing
/// its required host/port is a configuration error, not a silently-accepted
/// URL.
pub fn parse(uri: &str) -> Result<EndpointUri> {
    let url = Url::parse(uri).map_err(|e| Error::BadConfig(format!("bad endpoint uri: {e}")))?;

    let interface = match url.scheme() {
        "rtp" => Interface::AudioSource(None),
        "rtp+rs8m" => Interface::AudioSource(Some(FecScheme::ReedSolomon8m)),
        "rs8m" => Interface::AudioRepair(FecScheme::ReedSolomon8m),
        "rtp+ldpc" => Interface::AudioSource(Some(FecScheme::LdpcStaircase)),
        "ldpc" => Interface::AudioRepair(FecScheme::LdpcStaircase),
        "rtcp" => Interface::AudioControl,
        "rtsp" => Interface::SessionControl,
        other => return Err(Error::BadConfig(format!("unrecognized endpoint scheme: {other}"))),
    };

    let host = url
        .host_str()
        .ok_or_else(|| Error::BadConfig("endpoint uri is missing a host".into()))?
        .to_string();

    let port = url.port().unwrap_or(match interface {
        Interface::SessionControl => RTSP_DEFAULT_PORT,
        _ => return Err(Error::BadConfig("endpoint uri is missing a port".into())),
    });

    Ok(EndpointUri { interface, host, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_source() {
        let e = parse("rtp://127.0.0.1:10001").unwrap();
        assert_eq!(e.interface, Interface::AudioSource(None));
        assert_eq!(e.port, 10001);
    }

    #[test]
    fn parses_fec_source_and_matching_repair() {
        let source = parse("rtp+rs8m://127.0.0.1:10001").unwrap();
        assert_eq!(source.interface, Interface::AudioSource(Some(FecScheme::ReedSolomon8m)));
        let repair = parse("rs8m://127.0.0.1:10002").unwrap();
        assert_eq!(repair.interface, Interface::AudioRepair(FecScheme::ReedSolomon8m));
    }

    #[test]
    fn rtsp_defaults_to_554() {
        let e = parse("rtsp://127.0.0.1").unwrap();
        assert_eq!(e.port, 554);
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(parse("http://127.0.0.1:80").is_err());
    }

    #[test]
    fn rejects_missing_port_on_non_rtsp_scheme() {
        assert!(parse("rtp://127.0.0.1").is_err());
    }
}
