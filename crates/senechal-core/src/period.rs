//! Calendar period arithmetic.
//!
//! A period is a half-open interval `[start, end)` of naive local time.
//! Periods of one kind tile the timeline: the `end` of one period is the
//! `start` of the next, so a sample at exactly midnight belongs to exactly one
//! day.

use std::{cmp::Ordering, collections::BTreeSet, fmt};

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::Error;

// ─── PeriodKind ──────────────────────────────────────────────────────────────

/// The granularity of a materialised summary.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PeriodKind {
  Day,
  /// ISO week, Monday 00:00 to the following Monday 00:00.
  Week,
  Month,
  Year,
}

impl PeriodKind {
  /// The string stored in `period_type` columns.
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self, Error> {
    s.parse().map_err(|_| Error::UnknownPeriodKind(s.to_owned()))
  }
}

// ─── Period ──────────────────────────────────────────────────────────────────

/// One calendar-aligned interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
  pub kind:  PeriodKind,
  pub start: NaiveDateTime,
  /// Exclusive.
  pub end:   NaiveDateTime,
}

impl Period {
  /// The period of `kind` that contains `t`.
  pub fn containing(t: NaiveDateTime, kind: PeriodKind) -> Self {
    Self::for_date(t.date(), kind)
  }

  /// The period of `kind` that contains the calendar day `date`.
  pub fn for_date(date: NaiveDate, kind: PeriodKind) -> Self {
    let first = match kind {
      PeriodKind::Day => date,
      PeriodKind::Week => {
        date - Days::new(u64::from(date.weekday().num_days_from_monday()))
      }
      PeriodKind::Month => date - Days::new(u64::from(date.day0())),
      PeriodKind::Year => date - Days::new(u64::from(date.ordinal0())),
    };
    let next = next_start(kind, first);
    Self {
      kind,
      start: first.and_time(NaiveTime::MIN),
      end: next.and_time(NaiveTime::MIN),
    }
  }

  pub fn contains(&self, t: NaiveDateTime) -> bool {
    self.start <= t && t < self.end
  }

  /// The period of the same kind that immediately follows this one.
  pub fn next(&self) -> Self { Self::containing(self.end, self.kind) }

  pub fn start_date(&self) -> NaiveDate { self.start.date() }

  /// The last day inside the period.
  pub fn last_date(&self) -> NaiveDate { self.end.date() - Days::new(1) }
}

/// First day of the period following the one that starts on `first`.
fn next_start(kind: PeriodKind, first: NaiveDate) -> NaiveDate {
  match kind {
    PeriodKind::Day => first + Days::new(1),
    PeriodKind::Week => first + Days::new(7),
    PeriodKind::Month => {
      // Day 32 from the 1st always lands in the following month.
      let ahead = first + Days::new(32);
      ahead - Days::new(u64::from(ahead.day0()))
    }
    PeriodKind::Year => {
      let ahead = first + Days::new(366);
      ahead - Days::new(u64::from(ahead.ordinal0()))
    }
  }
}

impl Ord for Period {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.start, self.kind, self.end).cmp(&(other.start, other.kind, other.end))
  }
}

impl PartialOrd for Period {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for Period {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} [{}, {})", self.kind, self.start, self.end)
  }
}

// ─── Affected periods ────────────────────────────────────────────────────────

/// Every period, of every kind, that owns at least one of `timestamps`.
///
/// This is the set to mark dirty when the given raw samples change.
pub fn affected_periods<I>(timestamps: I) -> BTreeSet<Period>
where
  I: IntoIterator<Item = NaiveDateTime>,
{
  timestamps
    .into_iter()
    .flat_map(|t| PeriodKind::iter().map(move |kind| Period::containing(t, kind)))
    .collect()
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
      .unwrap()
      .and_hms_opt(h, 0, 0)
      .unwrap()
  }

  fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime { at(y, m, d, 0) }

  #[test]
  fn sample_marks_one_period_of_each_kind() {
    let periods = affected_periods([at(2024, 3, 15, 8)]);
    let got: Vec<_> = periods.iter().map(|p| (p.kind, p.start, p.end)).collect();

    assert_eq!(got.len(), 4);
    assert!(got.contains(&(PeriodKind::Day, midnight(2024, 3, 15), midnight(2024, 3, 16))));
    assert!(got.contains(&(PeriodKind::Week, midnight(2024, 3, 11), midnight(2024, 3, 18))));
    assert!(got.contains(&(PeriodKind::Month, midnight(2024, 3, 1), midnight(2024, 4, 1))));
    assert!(got.contains(&(PeriodKind::Year, midnight(2024, 1, 1), midnight(2025, 1, 1))));
  }

  #[test]
  fn december_rolls_into_next_year() {
    let month = Period::containing(at(2023, 12, 31, 23), PeriodKind::Month);
    assert_eq!(month.start, midnight(2023, 12, 1));
    assert_eq!(month.end, midnight(2024, 1, 1));
  }

  #[test]
  fn leap_february_ends_on_march_first() {
    let month = Period::containing(at(2024, 2, 29, 12), PeriodKind::Month);
    assert_eq!(month.end, midnight(2024, 3, 1));
    assert_eq!(month.last_date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
  }

  #[test]
  fn leap_year_spans_366_days() {
    let year = Period::containing(at(2024, 12, 31, 23), PeriodKind::Year);
    assert_eq!(year.start, midnight(2024, 1, 1));
    assert_eq!(year.end, midnight(2025, 1, 1));
  }

  #[test]
  fn sunday_belongs_to_the_preceding_monday() {
    let week = Period::containing(at(2024, 3, 17, 23), PeriodKind::Week);
    assert_eq!(week.start, midnight(2024, 3, 11));
  }

  #[test]
  fn week_crossing_year_boundary() {
    let week = Period::containing(at(2025, 1, 1, 9), PeriodKind::Week);
    assert_eq!(week.start, midnight(2024, 12, 30));
    assert_eq!(week.end, midnight(2025, 1, 6));
  }

  #[test]
  fn midnight_belongs_to_the_new_day_only() {
    let t = midnight(2024, 3, 16);
    let before = Period::containing(at(2024, 3, 15, 23), PeriodKind::Day);
    assert!(!before.contains(t));
    assert!(Period::containing(t, PeriodKind::Day).contains(t));
  }

  #[test]
  fn duplicate_samples_collapse() {
    let periods = affected_periods([at(2024, 3, 15, 8), at(2024, 3, 15, 20)]);
    assert_eq!(periods.len(), 4);
  }

  #[test]
  fn kind_round_trips_through_text() {
    for kind in PeriodKind::iter() {
      assert_eq!(PeriodKind::parse(kind.as_str()).unwrap(), kind);
    }
    assert!(PeriodKind::parse("fortnight").is_err());
  }

  fn any_kind() -> impl Strategy<Value = PeriodKind> {
    prop_oneof![
      Just(PeriodKind::Day),
      Just(PeriodKind::Week),
      Just(PeriodKind::Month),
      Just(PeriodKind::Year),
    ]
  }

  proptest! {
    #[test]
    fn period_contains_its_timestamp(
      secs in 0i64..4_102_444_800,
      kind in any_kind(),
    ) {
      let t = chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
      let p = Period::containing(t, kind);
      prop_assert!(p.start <= t && t < p.end);
      prop_assert_eq!(Period::containing(p.start, kind), p);
    }

    #[test]
    fn neighbours_are_contiguous(
      secs in 0i64..4_102_444_800,
      kind in any_kind(),
    ) {
      let t = chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
      let p = Period::containing(t, kind);
      let next = p.next();
      prop_assert_eq!(next.start, p.end);
      prop_assert!(next.end > next.start);
      prop_assert!(!p.contains(next.start));
    }
  }
}
