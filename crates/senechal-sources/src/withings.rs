//! Withings adapter over the scale/cuff measurement stream.
//!
//! Every measurement is one row of `measurements(id, date, type, value)`
//! with a numeric vendor type code. Ids only grow, so new data is found by
//! reading past the last processed id.

use std::path::PathBuf;

use senechal_core::{
  metric::{MetricDef, MetricGroup, MetricSummary},
  period::Period,
  source::{IncrementalSource, RawRecord, Source, SourceAdapter},
  timestamp::{format_datetime, parse_datetime},
};

use crate::{Error, Result, raw};

#[derive(Debug, Clone)]
pub struct WithingsPaths {
  pub db: PathBuf,
}

const fn def(metric_id: &'static str, group: MetricGroup, unit: &'static str) -> MetricDef {
  MetricDef { metric_id, group, unit }
}

/// Every metric the Withings adapter can emit.
pub static WITHINGS_METRICS: &[MetricDef] = &[
  def("weight", MetricGroup::Body, "kg"),
  def("height", MetricGroup::Body, "m"),
  def("fat_free_mass", MetricGroup::Body, "kg"),
  def("fat_ratio", MetricGroup::Body, "%"),
  def("fat_mass", MetricGroup::Body, "kg"),
  def("muscle_mass", MetricGroup::Body, "kg"),
  def("hydration", MetricGroup::Body, "kg"),
  def("bone_mass", MetricGroup::Body, "kg"),
  def("visceral_fat", MetricGroup::Body, "index"),
  def("bp_diastolic", MetricGroup::Heart, "mmHg"),
  def("bp_systolic", MetricGroup::Heart, "mmHg"),
  def("bp_hr", MetricGroup::Heart, "bpm"),
];

/// Vendor measurement type code → canonical metric id.
pub static WITHINGS_METRIC_MAP: &[(i64, &str)] = &[
  (1, "weight"),
  (4, "height"),
  (5, "fat_free_mass"),
  (6, "fat_ratio"),
  (8, "fat_mass"),
  (76, "muscle_mass"),
  (77, "hydration"),
  (88, "bone_mass"),
  (170, "visceral_fat"),
  (9, "bp_diastolic"),
  (10, "bp_systolic"),
  // cuff pulse; Garmin owns `hr`
  (11, "bp_hr"),
];

pub fn metric_for_type(kind: i64) -> Option<&'static str> {
  WITHINGS_METRIC_MAP
    .iter()
    .find(|(t, _)| *t == kind)
    .map(|(_, m)| *m)
}

#[derive(Debug, Clone)]
pub struct WithingsAdapter {
  paths: WithingsPaths,
}

impl WithingsAdapter {
  pub fn new(paths: WithingsPaths) -> Self { Self { paths } }
}

impl SourceAdapter for WithingsAdapter {
  type Error = Error;

  fn source(&self) -> Source { Source::Withings }

  fn metric_defs(&self) -> &'static [MetricDef] { WITHINGS_METRICS }

  async fn compute_period(&self, period: Period) -> Result<Vec<MetricSummary>> {
    let conn = raw::open(&self.paths.db).await?;
    let lo = format_datetime(period.start);
    let hi = format_datetime(period.end);

    let rows: Vec<(i64, Option<f64>, Option<f64>, Option<f64>, i64)> = conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT type, AVG(value), MIN(value), MAX(value), COUNT(value)
           FROM measurements
           WHERE date >= ?1 AND date < ?2
           GROUP BY type
           ORDER BY type",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![lo, hi], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut metrics: Vec<MetricSummary> = rows
      .into_iter()
      .filter(|(_, avg, _, _, count)| avg.is_some() && *count > 0)
      .filter_map(|(kind, avg, min, max, count)| {
        let metric_id = metric_for_type(kind)?;
        Some(MetricSummary { metric_id: metric_id.to_owned(), avg, min, max, count })
      })
      .collect();
    metrics.sort_by(|a, b| a.metric_id.cmp(&b.metric_id));
    Ok(metrics)
  }
}

impl IncrementalSource for WithingsAdapter {
  async fn records_since(&self, since_id: i64) -> Result<Vec<RawRecord>> {
    let conn = raw::open(&self.paths.db).await?;
    let rows: Vec<(i64, String)> = conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, date FROM measurements WHERE id > ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![since_id], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut records = Vec::with_capacity(rows.len());
    for (id, date) in rows {
      match parse_datetime(&date) {
        Ok(taken_at) => records.push(RawRecord { id, taken_at }),
        Err(err) => tracing::warn!("Skipping Withings measurement {id}: {err}"),
      }
    }
    Ok(records)
  }
}
