//! Small standalone helpers shared by config structs and the `demos/` CLIs.

use crate::error::{Error, Result};
use std::time::Duration;

/// Parses a human-readable duration of the form `<number><unit>`, where unit
/// is one of `ns`, `us`, `ms`, `s`, `m`, `h`. Used by typed config structs
/// and `clap` arguments (`--packet-length 10ms`, `--target-latency 200ms`).
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    let unit_start = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| Error::BadConfig(format!("missing unit in duration {input:?}")))?;
    let (number, unit) = input.split_at(unit_start);
    let value: f64 = number
        .parse()
        .map_err(|_| Error::BadConfig(format!("invalid number in duration {input:?}")))?;
    let nanos_per_unit: f64 = match unit {
        "ns" => 1.0,
        "us" => 1_000.0,
        "ms" => 1_000_000.0,
        "s" => 1_000_000_000.0,
        "m" => 60.0 * 1_000_000_000.0,
        "h" => 3_600.0 * 1_000_000_000.0,
        other => {
            return Err(Error::BadConfig(format!("unknown duration unit {other:?}")));
        }
    };
    Ok(Duration::from_nanos((value * nanos_per_unit) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_unit() {
        assert_eq!(parse_duration("10ms").unwrap(), Duration::from_millis(10));
        assert_eq!(parse_duration("200us").unwrap(), Duration::from_micros(200));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("abc").is_err());
    }
}
