use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("duration \"{0}\" has no numeric magnitude")]
    MissingMagnitude(String),
    #[error("duration \"{0}\" has an unknown or missing unit suffix")]
    UnknownSuffix(String),
    #[error("duration \"{0}\" is out of range")]
    OutOfRange(String),
}

const UNITS: &[(&str, u64)] = &[
    ("h", 3_600_000_000_000),
    ("min", 60_000_000_000),
    ("s", 1_000_000_000),
    ("ms", 1_000_000),
    ("us", 1_000),
    ("ns", 1),
];

/// Parses a single-term duration literal: an integer magnitude followed by
/// one of `h`, `min`, `s`, `ms`, `us`, `ns`. Compound terms, bare integers
/// and unknown suffixes are rejected.
pub fn parse_duration(text: &str) -> Result<Duration, DurationParseError> {
    let digits_end = text
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(digits_end);
    if digits.is_empty() {
        return Err(DurationParseError::MissingMagnitude(text.into()));
    }
    let magnitude: u64 = digits
        .parse()
        .map_err(|_| DurationParseError::OutOfRange(text.into()))?;
    let nanos_per_unit = UNITS
        .iter()
        .find(|(unit, _)| *unit == suffix)
        .map(|&(_, nanos)| nanos)
        .ok_or_else(|| DurationParseError::UnknownSuffix(text.into()))?;
    let nanos = magnitude
        .checked_mul(nanos_per_unit)
        .ok_or_else(|| DurationParseError::OutOfRange(text.into()))?;
    Ok(Duration::from_nanos(nanos))
}

/// Formats a duration with the largest suffix that divides it exactly.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    for &(unit, nanos_per_unit) in UNITS {
        if nanos % u128::from(nanos_per_unit) == 0 {
            return format!("{}{}", nanos / u128::from(nanos_per_unit), unit);
        }
    }
    unreachable!("ns divides every duration");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_suffix() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2min").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("100ns").unwrap(), Duration::from_nanos(100));
    }

    #[test]
    fn rejects_bare_integers_and_unknown_suffixes() {
        assert!(matches!(
            parse_duration("40"),
            Err(DurationParseError::UnknownSuffix(_))
        ));
        assert!(matches!(
            parse_duration("40sec"),
            Err(DurationParseError::UnknownSuffix(_))
        ));
        assert!(matches!(
            parse_duration("ms"),
            Err(DurationParseError::MissingMagnitude(_))
        ));
    }

    #[test]
    fn rejects_compound_terms() {
        assert!(parse_duration("1h30min").is_err());
        assert!(parse_duration("1 h").is_err());
    }

    #[test]
    fn format_normalizes_within_suffix() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1s");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2min");
    }

    #[test]
    fn parse_format_round_trip() {
        for text in ["7h", "3min", "42s", "999ms", "13us", "1ns"] {
            assert_eq!(format_duration(parse_duration(text).unwrap()), text);
        }
    }
}
