//! Source identity and the adapter traits implemented per wearable source.

use std::future::Future;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  Error,
  metric::{MetricDef, MetricSummary},
  period::Period,
};

/// A wearable or scale whose raw store feeds the canonical summaries.
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
pub enum Source {
  Garmin,
  Withings,
}

impl Source {
  /// The string stored in `source` columns.
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self, Error> {
    s.parse().map_err(|_| Error::UnknownSource(s.to_owned()))
  }
}

/// An identifier and timestamp read from an append-only raw stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
  pub id:       i64,
  pub taken_at: NaiveDateTime,
}

/// Extracts canonical metric summaries for one source.
///
/// Adapters are read-only against their raw stores. They return the metric
/// set for a period and leave persistence to the caller, so a period is
/// written in one batch or not at all.
pub trait SourceAdapter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn source(&self) -> Source;

  /// Every canonical metric this adapter can emit.
  fn metric_defs(&self) -> &'static [MetricDef];

  /// Compute every known metric over `[period.start, period.end)`.
  ///
  /// Metrics with no samples are absent from the result. The output is a
  /// pure function of the raw data in range, in a stable order.
  fn compute_period(
    &self,
    period: Period,
  ) -> impl Future<Output = Result<Vec<MetricSummary>, Self::Error>> + Send + '_;
}

/// A source whose raw store exposes a monotonically increasing record id.
pub trait IncrementalSource: SourceAdapter {
  /// Records with `id > since_id`, ordered by id ascending.
  fn records_since(
    &self,
    since_id: i64,
  ) -> impl Future<Output = Result<Vec<RawRecord>, Self::Error>> + Send + '_;
}
