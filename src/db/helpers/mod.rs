use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use log::debug;

use crate::models::{normalize_date, parse_timestamp};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Stored timestamps that no longer parse read back as `None`.
pub fn parse_optional_timestamp(
    value: Option<String>,
    field: &str,
) -> Option<DateTime<FixedOffset>> {
    let raw = value?;
    match parse_timestamp(&raw) {
        Ok(ts) => Some(ts),
        Err(err) => {
            debug!("{field}: {err}");
            None
        }
    }
}

/// Stored dates are re-normalized on the way out, falling back to `fallback`.
pub fn parse_optional_date(
    value: Option<String>,
    fallback: Option<DateTime<FixedOffset>>,
) -> Option<NaiveDate> {
    value
        .and_then(|raw| match normalize_date(&raw) {
            Ok(date) => Some(date),
            Err(err) => {
                debug!("{err}");
                None
            }
        })
        .or_else(|| fallback.map(|ts| ts.date_naive()))
}
