use senechal_core::{
  metric::{MetricDef, MetricSummary},
  period::Period,
  source::{Source, SourceAdapter},
};

use crate::{Error, GarminAdapter, Result, WithingsAdapter};

/// Any configured source, for runs that iterate over all of them.
#[derive(Debug, Clone)]
pub enum Adapter {
  Garmin(GarminAdapter),
  Withings(WithingsAdapter),
}

impl SourceAdapter for Adapter {
  type Error = Error;

  fn source(&self) -> Source {
    match self {
      Self::Garmin(a) => a.source(),
      Self::Withings(a) => a.source(),
    }
  }

  fn metric_defs(&self) -> &'static [MetricDef] {
    match self {
      Self::Garmin(a) => a.metric_defs(),
      Self::Withings(a) => a.metric_defs(),
    }
  }

  async fn compute_period(&self, period: Period) -> Result<Vec<MetricSummary>> {
    match self {
      Self::Garmin(a) => a.compute_period(period).await,
      Self::Withings(a) => a.compute_period(period).await,
    }
  }
}
