use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::ParseError;

pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

/// Reduces a textual date or timestamp to the calendar date it names.
///
/// Timestamps carrying an offset keep the date as written at that offset, so
/// `2024-01-01T23:30:00-05:00` is `2024-01-01`.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts.date());
        }
    }

    Err(ParseError::new("date", raw))
}

/// Parses an ISO-8601 timestamp. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts);
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&ts).fixed_offset());
        }
    }
    Err(ParseError::new("timestamp", raw))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn canonical_dates_pass_through() {
        assert_eq!(normalize_date("2024-01-05"), Ok(ymd(2024, 1, 5)));
        assert_eq!(format_date(ymd(2024, 1, 5)), "2024-01-05");
    }

    #[test]
    fn timestamps_reduce_to_their_written_date() {
        assert_eq!(normalize_date("2024-01-01T23:30:00-05:00"), Ok(ymd(2024, 1, 1)));
        assert_eq!(normalize_date("2024-03-09T10:00:00.000Z"), Ok(ymd(2024, 3, 9)));
        assert_eq!(normalize_date("2024-03-09 10:00:00"), Ok(ymd(2024, 3, 9)));
    }

    #[test]
    fn sheet_style_dates_are_accepted() {
        assert_eq!(normalize_date("3/9/2024"), Ok(ymd(2024, 3, 9)));
        assert_eq!(normalize_date("2024/03/09"), Ok(ymd(2024, 3, 9)));
        assert_eq!(normalize_date(" 2024-03-09 "), Ok(ymd(2024, 3, 9)));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = normalize_date("yesterday").unwrap_err();
        assert_eq!(err.field, "date");
        assert!(parse_timestamp("soon").is_err());
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let ts = parse_timestamp("2024-03-09 10:00:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(ts.to_rfc3339(), "2024-03-09T10:00:00+00:00");
    }
}
