//! Codec for vendor `HH:MM[:SS]` duration encodings.
//!
//! Garmin stores sleep and activity durations as time-of-day strings. The
//! canonical unit for these metrics is whole minutes; seconds are dropped.

use crate::{Error, Result};

/// Decode `"HH:MM"`, `"H:MM"` or `"HH:MM:SS[.ffffff]"` into whole minutes.
pub fn parse_duration_to_minutes(encoded: &str) -> Result<i64> {
  let invalid = || Error::InvalidDuration(encoded.to_owned());

  let mut parts = encoded.trim().split(':');
  let hours = parts.next().ok_or_else(invalid)?;
  let minutes = parts.next().ok_or_else(invalid)?;
  if let Some(seconds) = parts.next() {
    let (whole, frac) = seconds.split_once('.').unwrap_or((seconds, "0"));
    if !all_digits(whole) || !all_digits(frac) {
      return Err(invalid());
    }
  }
  if parts.next().is_some() || !all_digits(hours) || !all_digits(minutes) {
    return Err(invalid());
  }

  let hours: i64 = hours.parse().map_err(|_| invalid())?;
  let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
  if !(0..60).contains(&minutes) {
    return Err(invalid());
  }

  hours
    .checked_mul(60)
    .and_then(|h| h.checked_add(minutes))
    .ok_or_else(invalid)
}

fn all_digits(field: &str) -> bool {
  !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

/// Whether a text value looks like a duration rather than a plain number.
pub fn is_duration_encoded(value: &str) -> bool { value.contains(':') }
