//! Garmin adapter over the three GarminDB stores.
//!
//! A period is read from the vendor summary table when it has a row for the
//! period's first day. Otherwise the heart, sleep, breathing and activity
//! families are aggregated from the raw tables.

mod map;
mod summary;

use std::{
  collections::{BTreeMap, BTreeSet},
  path::PathBuf,
};

pub use map::GARMIN_METRICS;
use senechal_core::{
  metric::{MetricDef, MetricSummary},
  period::Period,
  source::{Source, SourceAdapter},
};

use crate::{
  Error, Result,
  raw::{self, DecodedStats, NumericStat, TimeColumn},
};

/// Locations of the GarminDB files.
#[derive(Debug, Clone)]
pub struct GarminPaths {
  /// `garmin.db`: daily resting heart rate and sleep.
  pub garmin_db:     PathBuf,
  /// `garmin_monitoring.db`: intraday monitoring streams.
  pub monitoring_db: PathBuf,
  /// `garmin_summary.db`: vendor-computed day/week/month/year rollups.
  pub summary_db:    PathBuf,
}

// ─── Raw families ────────────────────────────────────────────────────────────

static DAILY_HEART: &[NumericStat] = &[NumericStat {
  table:  "resting_hr",
  column: "resting_heart_rate",
  time:   TimeColumn::Date("day"),
  metric: "rhr",
}];

static MONITORING_HEART: &[NumericStat] = &[NumericStat {
  table:  "monitoring_hr",
  column: "heart_rate",
  time:   TimeColumn::Timestamp("timestamp"),
  metric: "hr",
}];

static BREATHING: &[NumericStat] = &[
  NumericStat {
    table:  "monitoring_pulse_ox",
    column: "pulse_ox",
    time:   TimeColumn::Timestamp("timestamp"),
    metric: "spo2",
  },
  NumericStat {
    table:  "monitoring_rr",
    column: "rr",
    time:   TimeColumn::Timestamp("timestamp"),
    metric: "resp_rate",
  },
];

static SLEEP: DecodedStats = DecodedStats {
  table:   "sleep",
  time:    TimeColumn::Date("day"),
  columns: &[
    ("total_sleep", "sleep_total"),
    ("deep_sleep", "sleep_deep"),
    ("rem_sleep", "sleep_rem"),
    ("light_sleep", "sleep_light"),
    ("score", "sleep_score"),
  ],
};

static ACTIVITY: DecodedStats = DecodedStats {
  table:   "monitoring_intensity",
  time:    TimeColumn::Timestamp("timestamp"),
  columns: &[
    ("moderate_activity_time", "intensity_mod"),
    ("vigorous_activity_time", "intensity_vig"),
  ],
};

// ─── Adapter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GarminAdapter {
  paths: GarminPaths,
}

impl GarminAdapter {
  pub fn new(paths: GarminPaths) -> Self { Self { paths } }

  /// Every period that has a vendor summary row, for full-rescan discovery.
  pub async fn summary_periods(&self) -> Result<BTreeSet<Period>> {
    let conn = raw::open(&self.paths.summary_db).await?;
    summary::discover(&conn).await
  }

  /// Metrics from the vendor summary row for `period`; empty when there is
  /// no usable row.
  pub async fn summary_metrics(&self, period: Period) -> Result<Vec<MetricSummary>> {
    let conn = raw::open(&self.paths.summary_db).await?;
    match summary::fetch(&conn, period).await? {
      Some(row) => row.translate(),
      None => {
        tracing::debug!("No Garmin summary row for {period}");
        Ok(Vec::new())
      }
    }
  }

  /// Metrics aggregated directly from the raw tables over `period`.
  pub async fn raw_metrics(&self, period: Period) -> Result<Vec<MetricSummary>> {
    let garmin = raw::open(&self.paths.garmin_db).await?;
    let monitoring = raw::open(&self.paths.monitoring_db).await?;

    let mut metrics = BTreeMap::new();
    let families = [
      raw::numeric_stats(&garmin, DAILY_HEART, period).await?,
      raw::numeric_stats(&monitoring, MONITORING_HEART, period).await?,
      raw::decoded_stats(&garmin, &SLEEP, period).await?,
      raw::numeric_stats(&monitoring, BREATHING, period).await?,
      raw::decoded_stats(&monitoring, &ACTIVITY, period).await?,
    ];
    for summary in families.into_iter().flatten() {
      metrics.insert(summary.metric_id.clone(), summary);
    }
    Ok(metrics.into_values().collect())
  }
}

impl SourceAdapter for GarminAdapter {
  type Error = Error;

  fn source(&self) -> Source { Source::Garmin }

  fn metric_defs(&self) -> &'static [MetricDef] { GARMIN_METRICS }

  async fn compute_period(&self, period: Period) -> Result<Vec<MetricSummary>> {
    let from_summary = self.summary_metrics(period).await?;
    if !from_summary.is_empty() {
      tracing::info!(
        "Retrieved {} metrics from Garmin summary database for {period}",
        from_summary.len()
      );
      return Ok(from_summary);
    }

    tracing::info!("No summary data for {period}, using raw data");
    self.raw_metrics(period).await
  }
}
