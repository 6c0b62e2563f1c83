//! Which periods a run marks dirty before processing.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate, NaiveTime};
use senechal_core::{
  period::{Period, affected_periods},
  timestamp::parse_date,
};

use crate::{Error, Result};

/// The scope selected by `--since`, `--days`, `--force-date` or none of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  /// Every day from the date through today.
  Since(NaiveDate),
  /// The last `n` days and today.
  LastDays(u32),
  /// Only the periods containing one day.
  ForceDate(NaiveDate),
  /// Whatever the source can discover on its own: the vendor summary tables
  /// for Garmin, records past the cursor for Withings.
  Discover,
}

impl Scope {
  /// Build a scope from the mutually exclusive command-line flags.
  pub fn from_flags(
    since: Option<&str>,
    days: Option<i64>,
    force_date: Option<&str>,
  ) -> Result<Self> {
    if let Some(since) = since {
      return parse_since(since).map(Self::Since);
    }
    if let Some(days) = days {
      return match u32::try_from(days) {
        Ok(n) if n >= 1 => Ok(Self::LastDays(n)),
        _ => Err(Error::InvalidDays(days)),
      };
    }
    if let Some(date) = force_date {
      return parse_date(date)
        .map(Self::ForceDate)
        .map_err(|_| Error::InvalidDate(date.to_owned()));
    }
    Ok(Self::Discover)
  }

  /// The days covered by a date-bounded scope, first and last inclusive.
  pub fn days(self, today: NaiveDate) -> Result<Option<(NaiveDate, NaiveDate)>> {
    Ok(match self {
      Self::Since(first) => Some((first, today)),
      Self::LastDays(n) => {
        let first = today
          .checked_sub_days(Days::new(u64::from(n)))
          .ok_or(Error::InvalidDays(i64::from(n)))?;
        Some((first, today))
      }
      Self::ForceDate(day) => Some((day, day)),
      Self::Discover => None,
    })
  }

  /// Every period touched by the scope's days; `None` for [`Scope::Discover`].
  pub fn periods(self, today: NaiveDate) -> Result<Option<BTreeSet<Period>>> {
    let Some((first, last)) = self.days(today)? else {
      return Ok(None);
    };
    let days = first
      .iter_days()
      .take_while(|d| *d <= last)
      .map(|d| d.and_time(NaiveTime::MIN));
    Ok(Some(affected_periods(days)))
  }
}

/// `DD/MM/YYYY`, with ISO `YYYY-MM-DD` also accepted.
pub fn parse_since(s: &str) -> Result<NaiveDate> {
  let s = s.trim();
  if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
    return Ok(date);
  }
  parse_date(s).map_err(|_| Error::InvalidSince(s.to_owned()))
}
