//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Bookkeeping instants (`raw_data_updated`, `last_updated`, ...) are stored
//! as RFC 3339 UTC with fixed microsecond precision so that textual
//! comparison in SQL orders them correctly. Period boundaries are naive local
//! timestamps.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use senechal_core::{
  metric::SummaryRecord,
  period::{Period, PeriodKind},
  source::Source,
  store::DirtyPeriod,
  timestamp::{format_datetime, parse_datetime},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Period boundaries ───────────────────────────────────────────────────────

pub fn encode_naive(t: NaiveDateTime) -> String { format_datetime(t) }

pub fn decode_naive(s: &str) -> Result<NaiveDateTime> { Ok(parse_datetime(s)?) }

pub fn decode_period(kind: &str, start: &str, end: &str) -> Result<Period> {
  Ok(Period {
    kind:  PeriodKind::parse(kind)?,
    start: decode_naive(start)?,
    end:   decode_naive(end)?,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw column values read from a `source_updates` row.
pub struct RawDirtyPeriod {
  pub source:           String,
  pub period_type:      String,
  pub period_start:     String,
  pub period_end:       String,
  pub raw_data_updated: String,
  pub summary_updated:  Option<String>,
  pub needs_update:     bool,
}

impl RawDirtyPeriod {
  pub const COLUMNS: &'static str = "source, period_type, period_start, period_end, \
                                     raw_data_updated, summary_updated, needs_update";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      source:           row.get(0)?,
      period_type:      row.get(1)?,
      period_start:     row.get(2)?,
      period_end:       row.get(3)?,
      raw_data_updated: row.get(4)?,
      summary_updated:  row.get(5)?,
      needs_update:     row.get(6)?,
    })
  }

  pub fn into_dirty_period(self) -> Result<DirtyPeriod> {
    Ok(DirtyPeriod {
      source:           Source::parse(&self.source)?,
      period:           decode_period(
        &self.period_type,
        &self.period_start,
        &self.period_end,
      )?,
      raw_data_updated: decode_dt(&self.raw_data_updated)?,
      summary_updated:  self.summary_updated.as_deref().map(decode_dt).transpose()?,
      needs_update:     self.needs_update,
    })
  }
}

/// Raw column values read from a `summaries` row.
pub struct RawSummary {
  pub period_type:  String,
  pub period_start: String,
  pub period_end:   String,
  pub metric_id:    String,
  pub avg_value:    Option<f64>,
  pub min_value:    Option<f64>,
  pub max_value:    Option<f64>,
  pub sample_count: i64,
  pub last_updated: String,
}

impl RawSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      period_type:  row.get(0)?,
      period_start: row.get(1)?,
      period_end:   row.get(2)?,
      metric_id:    row.get(3)?,
      avg_value:    row.get(4)?,
      min_value:    row.get(5)?,
      max_value:    row.get(6)?,
      sample_count: row.get(7)?,
      last_updated: row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<SummaryRecord> {
    Ok(SummaryRecord {
      period:       decode_period(
        &self.period_type,
        &self.period_start,
        &self.period_end,
      )?,
      metric_id:    self.metric_id,
      avg:          self.avg_value,
      min:          self.min_value,
      max:          self.max_value,
      sample_count: self.sample_count,
      last_updated: decode_dt(&self.last_updated)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn instants_sort_textually() {
    let a = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }
}
