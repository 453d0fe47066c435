//! Analysis-window handling: ISO 8601 instants and durations, and the
//! optional `pad_times` widening applied before a fetch.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PalError, Result};

/// Closed time interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }

    /// Widen the window by the given pad on each side.
    pub fn pad(&self, before: Duration, after: Duration) -> Self {
        Self {
            start: self.start - before,
            end: self.end + after,
        }
    }

    pub fn iso_pair(&self) -> (String, String) {
        (to_iso(&self.start), to_iso(&self.end))
    }
}

/// Two ISO 8601 durations widening a fetch window on each side,
/// e.g. `["PT1H", "PT1H"]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PadTimes(pub [String; 2]);

impl PadTimes {
    pub fn durations(&self) -> Result<(Duration, Duration)> {
        Ok((parse_duration(&self.0[0])?, parse_duration(&self.0[1])?))
    }
}

pub fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Timezone-naive forms are taken as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
        if format == "%Y-%m-%d" {
            if let Ok(date) = chrono::NaiveDate::parse_from_str(text, format) {
                return Ok(date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc());
            }
        }
    }
    Err(PalError::InvalidTime(text.to_string()))
}

pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.fZ").to_string()
}

/// Parse an ISO 8601 duration of the `PnDTnHnMnS` family (weeks, months,
/// and years are not supported).
pub fn parse_duration(text: &str) -> Result<Duration> {
    let invalid = || PalError::InvalidDuration(text.to_string());

    let rest = text.strip_prefix('P').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut total = Duration::zero();
    let mut saw_component = false;

    for (part, units) in [(date_part, "D"), (time_part, "HMS")] {
        let mut number = String::new();
        let mut allowed = units.chars().peekable();
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                continue;
            }
            // Units must appear in order and at most once each
            let mut matched = false;
            while let Some(unit) = allowed.next() {
                if unit == c {
                    matched = true;
                    break;
                }
            }
            if !matched || number.is_empty() {
                return Err(invalid());
            }
            let value: f64 = number.parse().map_err(|_| invalid())?;
            number.clear();
            saw_component = true;
            let seconds = match c {
                'D' => value * 86_400.0,
                'H' => value * 3_600.0,
                'M' => value * 60.0,
                'S' => value,
                _ => return Err(invalid()),
            };
            total += Duration::microseconds((seconds * 1e6).round() as i64);
        }
        if !number.is_empty() {
            return Err(invalid());
        }
    }

    if !saw_component {
        return Err(invalid());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_durations() {
        assert_eq!(parse_duration("PT1H").unwrap(), Duration::hours(1));
        assert_eq!(
            parse_duration("PT1H30M").unwrap(),
            Duration::minutes(90)
        );
        assert_eq!(parse_duration("P1D").unwrap(), Duration::days(1));
        assert_eq!(
            parse_duration("P1DT12H").unwrap(),
            Duration::hours(36)
        );
        assert_eq!(
            parse_duration("PT0.5S").unwrap(),
            Duration::milliseconds(500)
        );
        assert_eq!(parse_duration("PT0S").unwrap(), Duration::zero());
    }

    #[test]
    fn rejects_malformed_durations() {
        for bad in ["", "P", "PT", "1H", "PTH", "PT1X", "PT1M30H", "P-1D"] {
            assert!(
                parse_duration(bad).is_err(),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn parses_naive_and_offset_times() {
        let a = parse_time("2016-01-01T00:00:00").unwrap();
        let b = parse_time("2016-01-01T00:00:00Z").unwrap();
        let c = parse_time("2016-01-01").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_time("not a time").is_err());
    }

    #[test]
    fn pad_widens_both_sides() {
        let window = TimeWindow::parse("2016-01-01T06:00:00", "2016-01-01T12:00:00").unwrap();
        let padded = window.pad(Duration::hours(1), Duration::hours(2));
        assert_eq!(padded.start, parse_time("2016-01-01T05:00:00").unwrap());
        assert_eq!(padded.end, parse_time("2016-01-01T14:00:00").unwrap());
        // The original window is untouched
        assert_eq!(window.iso_pair().0, "2016-01-01T06:00:00Z");
    }
}
