//! Text encodings for naive (wall-clock) timestamps and dates.
//!
//! Raw stores written by the vendor sync tools keep local time without an
//! offset, either as `YYYY-MM-DD HH:MM:SS` or as a bare `YYYY-MM-DD`. The
//! canonical store uses the same shapes so range comparisons stay textual.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::{Error, Result};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted input shapes, tried in order.
const DATETIME_INPUTS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M",
];

pub fn format_datetime(t: NaiveDateTime) -> String {
  t.format(DATETIME_FORMAT).to_string()
}

pub fn format_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

/// Parse a timestamp in any of the shapes the raw stores use. A bare date is
/// read as midnight of that day.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
  let s = s.trim();
  for fmt in DATETIME_INPUTS {
    if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
      return Ok(t);
    }
  }
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map(|d| d.and_time(NaiveTime::MIN))
    .map_err(|_| Error::InvalidTimestamp(s.to_owned()))
}

/// Parse a calendar date, accepting a full timestamp and dropping its time.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
  parse_datetime(s).map(|t| t.date())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_all_raw_store_shapes() {
    let expected = NaiveDate::from_ymd_opt(2024, 3, 15)
      .unwrap()
      .and_hms_opt(8, 0, 0)
      .unwrap();
    assert_eq!(parse_datetime("2024-03-15 08:00:00").unwrap(), expected);
    assert_eq!(parse_datetime("2024-03-15T08:00:00").unwrap(), expected);
    assert_eq!(parse_datetime("2024-03-15 08:00").unwrap(), expected);
    assert_eq!(parse_datetime("2024-03-15 08:00:00.000000").unwrap(), expected);
  }

  #[test]
  fn bare_date_is_midnight() {
    let t = parse_datetime("2024-03-15").unwrap();
    assert_eq!(format_datetime(t), "2024-03-15 00:00:00");
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(matches!(
      parse_datetime("15/03/2024"),
      Err(Error::InvalidTimestamp(_))
    ));
  }
}
