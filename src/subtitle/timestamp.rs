use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, VidlocError};

/// Subtitle timestamp with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Negative and non-finite inputs clamp to zero.
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self((seconds * 1000.0).round() as u64)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1_000;
        let millis = self.0 % 1_000;

        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

impl FromStr for Timestamp {
    type Err = VidlocError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        let invalid = || VidlocError::UnsupportedFormat(format!("invalid timestamp '{}'", t));

        let (hms, frac) = match t.split_once(',').or_else(|| t.split_once('.')) {
            Some((hms, frac)) => (hms, Some(frac)),
            None => (t, None),
        };

        let parts: Vec<&str> = hms.split(':').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let number = |part: &str| -> Result<u64> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };

        let hours = number(parts[0])?;
        let minutes = number(parts[1])?;
        let secs = number(parts[2])?;
        if minutes >= 60 || secs >= 60 {
            return Err(invalid());
        }

        let millis = match frac {
            Some(frac) => {
                if frac.is_empty() || frac.len() > 3 {
                    return Err(invalid());
                }
                // "5" after the separator means 500 ms, not 5 ms
                let padded = format!("{:0<3}", frac);
                number(&padded)?
            }
            None => 0,
        };

        hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes * 60 + secs))
            .and_then(|s| s.checked_mul(1000))
            .and_then(|ms| ms.checked_add(millis))
            .map(Self)
            .ok_or_else(invalid)
    }
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
pub fn format_timestamp(seconds: f64) -> String {
    Timestamp::from_seconds(seconds).to_string()
}

/// Parse an SRT timestamp into seconds.
pub fn parse_timestamp(s: &str) -> Result<f64> {
    Ok(s.parse::<Timestamp>()?.as_seconds())
}

/// Parse the `start --> end` timing line of a subtitle block.
pub fn parse_time_range(line: &str) -> Result<(Timestamp, Timestamp)> {
    let (start, end) = line
        .split_once("-->")
        .ok_or_else(|| VidlocError::UnsupportedFormat(format!("missing '-->' in '{}'", line)))?;

    Ok((start.parse()?, end.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(65.123), "00:01:05,123");
        assert_eq!(format_timestamp(3661.500), "01:01:01,500");
        assert_eq!(format_timestamp(359_999.999), "99:59:59,999");
    }

    #[test]
    fn test_negative_seconds_clamp_to_zero() {
        assert_eq!(format_timestamp(-4.2), "00:00:00,000");
        assert_eq!(format_timestamp(f64::NAN), "00:00:00,000");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:01,000").unwrap(), 1.0);
        assert_eq!(parse_timestamp("01:01:01.500").unwrap(), 3661.5);
        assert_eq!(parse_timestamp(" 00:00:02,5 ").unwrap(), 2.5);
        assert!(parse_timestamp("00:61:00,000").is_err());
        assert!(parse_timestamp("1:2").is_err());
        assert!(parse_timestamp("aa:bb:cc,ddd").is_err());
    }

    #[test]
    fn test_oversized_hours_are_rejected() {
        assert!(parse_timestamp("99999999999999999:00:00,000").is_err());
        assert_eq!(parse_timestamp("1000:00:00,000").unwrap(), 3_600_000.0);
    }

    #[test]
    fn test_timestamp_round_trip_within_a_millisecond() {
        let mut seconds = 0.0;
        while seconds <= 359_999.999 {
            let parsed = parse_timestamp(&format_timestamp(seconds)).unwrap();
            assert!((parsed - seconds).abs() <= 0.001, "{} -> {}", seconds, parsed);
            seconds += 1234.567;
        }

        let edge = parse_timestamp(&format_timestamp(359_999.999)).unwrap();
        assert!((edge - 359_999.999).abs() <= 0.001);
    }

    #[test]
    fn test_parse_time_range() {
        let (start, end) = parse_time_range("00:00:01,000 --> 00:00:03,250").unwrap();
        assert_eq!(start.as_millis(), 1_000);
        assert_eq!(end.as_millis(), 3_250);
        assert!(parse_time_range("00:00:01,000 00:00:03,250").is_err());
    }
}
