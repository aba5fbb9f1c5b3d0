//! Feature row derivation
//!
//! The classifier consumes seven numeric columns: five calendar fields derived
//! from the measurement timestamp followed by the WGS84 coordinates.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

/// Number of columns in a feature row
pub const FEATURE_COUNT: usize = 7;

/// Column names in tensor order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "year",
    "month",
    "day",
    "hour",
    "day_of_week",
    "x_wgs84",
    "y_wgs84",
];

/// Offset-carrying formats RFC 3339 does not cover: minute precision and
/// basic `+hhmm` offsets
const OFFSET_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
];

/// Naive formats accepted once no offset form matched
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid isoformat string: '{0}'")]
pub struct TimestampError(pub String);

/// One model input row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRow {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    /// Monday = 0 ... Sunday = 6
    pub day_of_week: u32,
    pub x_wgs84: f64,
    pub y_wgs84: f64,
}

impl FeatureRow {
    pub fn from_timestamp(timestamp: NaiveDateTime, x_wgs84: f64, y_wgs84: f64) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
            day: timestamp.day(),
            hour: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_monday(),
            x_wgs84,
            y_wgs84,
        }
    }

    /// Values in [`FEATURE_NAMES`] order, as fed to the model tensor
    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.year as f32,
            self.month as f32,
            self.day as f32,
            self.hour as f32,
            self.day_of_week as f32,
            self.x_wgs84 as f32,
            self.y_wgs84 as f32,
        ]
    }
}

/// Parse an ISO-8601 date or date-time.
///
/// Offsets are accepted but not applied: the wall-clock fields as written are
/// what the calendar features are built from.
pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime, TimestampError> {
    let trimmed = input.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.naive_local());
    }

    // A trailing `Z` is the zero offset
    let zulu = trimmed
        .strip_suffix('Z')
        .map(|rest| format!("{rest}+00:00"));
    let offset_input = zulu.as_deref().unwrap_or(trimmed);
    for format in OFFSET_FORMATS {
        if let Ok(with_offset) = DateTime::parse_from_str(offset_input, format) {
            return Ok(with_offset.naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    // chrono needs a minute field, so hour-only input gets one appended
    let with_minutes = format!("{trimmed}:00");
    for format in &NAIVE_FORMATS[2..] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&with_minutes, format) {
            return Ok(parsed);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TimestampError(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_row() {
        let ts = parse_timestamp("2024-03-14T08:00:00").unwrap();
        let row = FeatureRow::from_timestamp(ts, 1.4, 43.6);

        assert_eq!(
            row,
            FeatureRow {
                year: 2024,
                month: 3,
                day: 14,
                hour: 8,
                day_of_week: 3,
                x_wgs84: 1.4,
                y_wgs84: 43.6,
            }
        );
        assert_eq!(row.to_array(), [2024.0, 3.0, 14.0, 8.0, 3.0, 1.4, 43.6]);
    }

    #[test]
    fn test_day_of_week_monday_is_zero() {
        // 2024-03-11 is a Monday and 2024-03-17 a Sunday
        for (offset, expected) in (11..=17).zip(0..=6) {
            let ts = parse_timestamp(&format!("2024-03-{offset:02}T12:00:00")).unwrap();
            assert_eq!(FeatureRow::from_timestamp(ts, 0.0, 0.0).day_of_week, expected);
        }
    }

    #[test]
    fn test_accepted_shapes() {
        let cases = [
            ("2024-03-14", 0),
            ("2024-03-14T08", 8),
            ("2024-03-14T08:30", 8),
            ("2024-03-14 08:30:15", 8),
            ("2024-03-14T08:30:15.250", 8),
            ("2024-03-14T08:00:00Z", 8),
            ("2024-03-14T23:00:00+01:00", 23),
            ("2024-03-14T08:00+01:00", 8),
            ("2024-03-14T08:00:00+0100", 8),
            ("2024-03-14 08:30:00-05:00", 8),
            ("2024-03-14 08:30+0530", 8),
            ("2024-03-14T08:00:00.123456+01:00", 8),
            ("2024-03-14T08:00Z", 8),
            ("  2024-03-14T08:00:00 ", 8),
        ];

        for (input, hour) in cases {
            let ts = parse_timestamp(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            let row = FeatureRow::from_timestamp(ts, 0.0, 0.0);
            assert_eq!((row.year, row.month, row.day, row.hour), (2024, 3, 14, hour), "{input}");
        }
    }

    #[test]
    fn test_offset_keeps_wall_clock_date() {
        // Still Sunday the 17th in UTC, but the written date is Monday the 18th
        let ts = parse_timestamp("2024-03-18T00:30:00+02:00").unwrap();
        let row = FeatureRow::from_timestamp(ts, 0.0, 0.0);
        assert_eq!((row.day, row.hour, row.day_of_week), (18, 0, 0));
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in ["", "yesterday", "2024-13-01", "14/03/2024", "2024-02-30T00:00:00"] {
            assert_eq!(parse_timestamp(input), Err(TimestampError(input.to_string())));
        }
    }
}
