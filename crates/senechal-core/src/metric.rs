//! Canonical metric values and the materialised summary record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::period::Period;

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// The family a canonical metric belongs to; stored as `metrics.group_id`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MetricGroup {
  Heart,
  Sleep,
  Breathing,
  Activity,
  Body,
  Stress,
  Energy,
}

impl MetricGroup {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// A canonical metric id with its family and unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDef {
  pub metric_id: &'static str,
  pub group:     MetricGroup,
  pub unit:      &'static str,
}

// ─── Computed values ─────────────────────────────────────────────────────────

/// The statistics an adapter computed for one metric over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
  pub metric_id: String,
  pub avg:       Option<f64>,
  pub min:       Option<f64>,
  pub max:       Option<f64>,
  pub count:     i64,
}

impl MetricSummary {
  /// A single observation, as read from a vendor summary row.
  pub fn single(metric_id: impl Into<String>, value: f64) -> Self {
    Self {
      metric_id: metric_id.into(),
      avg:       Some(value),
      min:       None,
      max:       None,
      count:     1,
    }
  }
}

/// One row of the canonical `summaries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
  pub period:       Period,
  pub metric_id:    String,
  pub avg:          Option<f64>,
  pub min:          Option<f64>,
  pub max:          Option<f64>,
  pub sample_count: i64,
  pub last_updated: DateTime<Utc>,
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// Running avg/min/max/count over samples fed in a fixed order.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
  sum:   f64,
  min:   Option<f64>,
  max:   Option<f64>,
  count: i64,
}

impl Aggregate {
  pub fn push(&mut self, value: f64) {
    self.sum += value;
    self.count += 1;
    self.min = Some(self.min.map_or(value, |m| m.min(value)));
    self.max = Some(self.max.map_or(value, |m| m.max(value)));
  }

  pub fn push_opt(&mut self, value: Option<f64>) {
    if let Some(v) = value {
      self.push(v);
    }
  }

  pub fn count(&self) -> i64 { self.count }

  /// `None` when no sample was pushed; an empty aggregate is unknown, not zero.
  pub fn finish(&self, metric_id: impl Into<String>) -> Option<MetricSummary> {
    if self.count == 0 {
      return None;
    }
    Some(MetricSummary {
      metric_id: metric_id.into(),
      avg:       Some(self.sum / self.count as f64),
      min:       self.min,
      max:       self.max,
      count:     self.count,
    })
  }
}
