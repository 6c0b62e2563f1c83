//! Read-only range queries against vendor raw stores.
//!
//! Table and column identifiers come only from the adapters' static
//! definitions; period bounds are always bound as parameters.

use std::path::Path;

use rusqlite::{OpenFlags, OptionalExtension as _, types::Value};
use senechal_core::{
  duration::{is_duration_encoded, parse_duration_to_minutes},
  metric::{Aggregate, MetricSummary},
  period::Period,
  timestamp::{format_date, format_datetime},
};
use tokio_rusqlite::Connection;

use crate::{Error, Result};

/// Open a raw store for reading. Each period opens its own connections and
/// drops them when done.
pub async fn open(path: &Path) -> Result<Connection> {
  Ok(Connection::open_with_flags(path.to_path_buf(), OpenFlags::SQLITE_OPEN_READ_ONLY).await?)
}

pub async fn table_exists(conn: &Connection, table: &'static str) -> Result<bool> {
  let found = conn
    .call(move |conn| {
      Ok(
        conn
          .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            rusqlite::params![table],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false),
      )
    })
    .await?;
  Ok(found)
}

// ─── Time columns ────────────────────────────────────────────────────────────

/// A raw table's time column and how period bounds are encoded against it.
#[derive(Debug, Clone, Copy)]
pub enum TimeColumn {
  /// `YYYY-MM-DD` values.
  Date(&'static str),
  /// `YYYY-MM-DD HH:MM:SS` values.
  Timestamp(&'static str),
}

impl TimeColumn {
  pub fn name(self) -> &'static str {
    match self {
      Self::Date(c) | Self::Timestamp(c) => c,
    }
  }

  /// Half-open `[lo, hi)` bounds for `period`.
  pub fn bounds(self, period: Period) -> (String, String) {
    match self {
      Self::Date(_) => (format_date(period.start.date()), format_date(period.end.date())),
      Self::Timestamp(_) => (format_datetime(period.start), format_datetime(period.end)),
    }
  }
}

// ─── Value decoding ──────────────────────────────────────────────────────────

/// Decode a raw cell into a canonical number. `HH:MM` text becomes minutes;
/// NULL is `None`.
pub fn decode_value(table: &'static str, column: &str, value: &Value) -> Result<Option<f64>> {
  let malformed = |v: String| Error::Malformed { table, column: column.to_owned(), value: v };
  match value {
    Value::Null => Ok(None),
    Value::Integer(i) => Ok(Some(*i as f64)),
    Value::Real(f) if f.is_finite() => Ok(Some(*f)),
    Value::Real(f) => Err(malformed(f.to_string())),
    Value::Text(s) if is_duration_encoded(s) => Ok(Some(parse_duration_to_minutes(s)? as f64)),
    Value::Text(s) => match s.trim().parse::<f64>() {
      Ok(f) if f.is_finite() => Ok(Some(f)),
      _ => Err(malformed(s.clone())),
    },
    Value::Blob(b) => Err(malformed(format!("<{} byte blob>", b.len()))),
  }
}

// ─── SQL-side aggregation ────────────────────────────────────────────────────

/// One numeric column aggregated by SQLite over a period.
#[derive(Debug)]
pub struct NumericStat {
  pub table:  &'static str,
  pub column: &'static str,
  pub time:   TimeColumn,
  pub metric: &'static str,
}

impl NumericStat {
  fn sql(&self) -> String {
    let (c, t, time) = (self.column, self.table, self.time.name());
    format!(
      "SELECT AVG({c}), MIN({c}), MAX({c}), COUNT({c}) FROM {t}
       WHERE {time} >= ?1 AND {time} < ?2"
    )
  }
}

/// Run each stat over `period`, keeping only those with at least one sample.
pub async fn numeric_stats(
  conn: &Connection,
  stats: &'static [NumericStat],
  period: Period,
) -> Result<Vec<MetricSummary>> {
  let out = conn
    .call(move |conn| {
      let mut out = Vec::new();
      for stat in stats {
        let (lo, hi) = stat.time.bounds(period);
        let (avg, min, max, count): (Option<f64>, Option<f64>, Option<f64>, i64) = conn
          .query_row(&stat.sql(), rusqlite::params![lo, hi], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
          })?;
        if count > 0 && avg.is_some() {
          out.push(MetricSummary { metric_id: stat.metric.to_owned(), avg, min, max, count });
        }
      }
      Ok(out)
    })
    .await?;
  Ok(out)
}

// ─── Rust-side aggregation ───────────────────────────────────────────────────

/// Several columns of one table, read row by row and decoded before
/// aggregation; used where values are stored as `HH:MM` text.
#[derive(Debug)]
pub struct DecodedStats {
  pub table:   &'static str,
  pub time:    TimeColumn,
  /// `(column, metric)` pairs.
  pub columns: &'static [(&'static str, &'static str)],
}

pub async fn decoded_stats(
  conn: &Connection,
  stats: &'static DecodedStats,
  period: Period,
) -> Result<Vec<MetricSummary>> {
  let width = stats.columns.len();
  let rows: Vec<Vec<Value>> = conn
    .call(move |conn| {
      let cols: Vec<&str> = stats.columns.iter().map(|(c, _)| *c).collect();
      let time = stats.time.name();
      let sql = format!(
        "SELECT {} FROM {} WHERE {time} >= ?1 AND {time} < ?2 ORDER BY {time}",
        cols.join(", "),
        stats.table,
      );
      let (lo, hi) = stats.time.bounds(period);
      let mut stmt = conn.prepare(&sql)?;
      let rows = stmt
        .query_map(rusqlite::params![lo, hi], |row| {
          (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await?;

  let mut aggs = vec![Aggregate::default(); width];
  for row in &rows {
    for ((agg, value), (column, _)) in aggs.iter_mut().zip(row).zip(stats.columns) {
      agg.push_opt(decode_value(stats.table, column, value)?);
    }
  }

  Ok(
    aggs
      .iter()
      .zip(stats.columns)
      .filter_map(|(agg, (_, metric))| agg.finish(*metric))
      .collect(),
  )
}
