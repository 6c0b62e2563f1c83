//! Vendor-precomputed summaries in the Garmin summary database.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{OptionalExtension as _, types::Value};
use senechal_core::{
  metric::MetricSummary,
  period::Period,
  timestamp::{format_date, parse_datetime},
};
use tokio_rusqlite::Connection;

use super::map::{SUMMARY_TABLES, SummaryTable, summary_metric, summary_table};
use crate::{
  Result,
  raw::{decode_value, table_exists},
};

/// One vendor summary row as column name → raw cell.
#[derive(Debug, Clone)]
pub struct SummaryRow {
  pub table: &'static str,
  pub cells: Vec<(String, Value)>,
}

impl SummaryRow {
  fn cell(&self, column: &str) -> Option<&Value> {
    self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
  }

  /// A mapped `_min`/`_max` sibling of an `_avg` column, if present.
  fn sibling(&self, column: &str) -> Result<Option<f64>> {
    if summary_metric(column).is_none() {
      return Ok(None);
    }
    match self.cell(column) {
      Some(value) => decode_value(self.table, column, value),
      None => Ok(None),
    }
  }

  /// Translate the row through the MetricMap.
  ///
  /// Unmapped and NULL columns are skipped. An `_avg` column carries its
  /// mapped `_min`/`_max` siblings as the metric's extremes.
  pub fn translate(&self) -> Result<Vec<MetricSummary>> {
    let mut out = BTreeMap::new();
    for (column, value) in &self.cells {
      let Some(metric) = summary_metric(column) else {
        continue;
      };
      let Some(avg) = decode_value(self.table, column, value)? else {
        continue;
      };

      let mut summary = MetricSummary::single(metric, avg);
      if let Some(base) = column.strip_suffix("_avg") {
        summary.min = self.sibling(&format!("{base}_min"))?;
        summary.max = self.sibling(&format!("{base}_max"))?;
      }
      out.insert(metric, summary);
    }
    Ok(out.into_values().collect())
  }
}

/// The vendor row for `period`, or `None` when its table or row is absent.
pub async fn fetch(conn: &Connection, period: Period) -> Result<Option<SummaryRow>> {
  let table = summary_table(period.kind);
  if !table_exists(conn, table.name).await? {
    tracing::warn!("Table {} not found in Garmin summary database", table.name);
    return Ok(None);
  }

  let day = format_date(period.start_date());
  let row = conn
    .call(move |conn| {
      let sql = format!(
        "SELECT * FROM {} WHERE {} = ?1 LIMIT 1",
        table.name, table.date_field
      );
      let mut stmt = conn.prepare(&sql)?;
      let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
      let width = names.len();
      let values = stmt
        .query_row(rusqlite::params![day], |row| {
          (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<_>>>()
        })
        .optional()?;
      Ok(values.map(|values| SummaryRow {
        table: table.name,
        cells: names.into_iter().zip(values).collect(),
      }))
    })
    .await?;
  Ok(row)
}

/// Every period that has a row in one of the vendor summary tables.
///
/// Missing tables are skipped with a warning; dates that do not parse are
/// logged and skipped.
pub async fn discover(conn: &Connection) -> Result<BTreeSet<Period>> {
  let mut periods = BTreeSet::new();
  for table in SUMMARY_TABLES {
    if !table_exists(conn, table.name).await? {
      tracing::warn!("Table {} not found in Garmin summary database", table.name);
      continue;
    }
    let found = table_periods(conn, table).await?;
    tracing::debug!("{} periods listed in {}", found.len(), table.name);
    periods.extend(found);
  }
  Ok(periods)
}

async fn table_periods(conn: &Connection, table: &'static SummaryTable) -> Result<Vec<Period>> {
  let values: Vec<Value> = conn
    .call(move |conn| {
      let sql = format!(
        "SELECT {field} FROM {name} ORDER BY {field}",
        field = table.date_field,
        name = table.name,
      );
      let mut stmt = conn.prepare(&sql)?;
      let rows = stmt
        .query_map([], |row| row.get::<_, Value>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await?;

  let mut periods = Vec::with_capacity(values.len());
  for value in values {
    let parsed = match &value {
      Value::Text(s) => parse_datetime(s).map_err(|e| e.to_string()),
      other => Err(format!("unexpected value {other:?}")),
    };
    match parsed {
      Ok(t) => periods.push(Period::containing(t, table.kind)),
      Err(err) => tracing::error!("Error parsing date from {}: {err}", table.name),
    }
  }
  Ok(periods)
}
