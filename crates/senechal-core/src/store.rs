//! Canonical-store traits: change tracking, summary persistence and cursors.
//!
//! The traits are implemented by storage backends (e.g.
//! `senechal-store-sqlite`). The orchestrator depends on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  metric::{MetricDef, MetricSummary, SummaryRecord},
  period::{Period, PeriodKind},
  source::Source,
};

/// The cursor key under which the highest folded raw id is stored.
pub const LAST_UID_KEY: &str = "last_uid";

// ─── Dirty period ────────────────────────────────────────────────────────────

/// A row of the change log: one (source, kind, start) period and whether its
/// summaries are stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirtyPeriod {
  pub source:           Source,
  pub period:           Period,
  pub raw_data_updated: DateTime<Utc>,
  pub summary_updated:  Option<DateTime<Utc>>,
  pub needs_update:     bool,
}

// ─── ChangeTracker ───────────────────────────────────────────────────────────

/// Durable per-source log of periods whose summaries need recomputation.
///
/// Rows are never deleted; a clean row is re-armed by the next `mark_dirty`.
pub trait ChangeTracker: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Upsert each period with `needs_update = true` and
  /// `raw_data_updated = touched_at`. Returns the number of periods touched.
  fn mark_dirty<'a>(
    &'a self,
    source: Source,
    periods: &'a [Period],
    touched_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// All periods for `source` with `needs_update = true`, oldest start first.
  fn list_dirty(
    &self,
    source: Source,
  ) -> impl Future<Output = Result<Vec<DirtyPeriod>, Self::Error>> + Send + '_;

  /// Clear `needs_update` for a period whose summaries were committed from
  /// raw data observed at `as_of`.
  ///
  /// A period touched after `as_of` stays dirty; returns whether the row was
  /// cleared.
  fn mark_clean(
    &self,
    source: Source,
    period: Period,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The change-log row for one period, clean or not.
  fn get_period(
    &self,
    source: Source,
    kind: PeriodKind,
    start: NaiveDateTime,
  ) -> impl Future<Output = Result<Option<DirtyPeriod>, Self::Error>> + Send + '_;

  /// Number of periods for `source` still needing an update.
  fn pending_count(
    &self,
    source: Source,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── SummaryStore ────────────────────────────────────────────────────────────

/// The canonical table of materialised period summaries.
pub trait SummaryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Upsert catalog entries for the metrics a source can emit.
  fn register_metrics<'a>(
    &'a self,
    defs: &'a [MetricDef],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Upsert every metric of one period in a single transaction.
  ///
  /// Existing rows are overwritten, not merged. If any write fails, none of
  /// the period's writes are kept. Returns the number of rows written.
  fn upsert_period<'a>(
    &'a self,
    period: Period,
    metrics: &'a [MetricSummary],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// All summaries for one period, ordered by metric id.
  fn get_summaries(
    &self,
    kind: PeriodKind,
    start: NaiveDateTime,
  ) -> impl Future<Output = Result<Vec<SummaryRecord>, Self::Error>> + Send + '_;

  /// Total number of summary rows.
  fn summary_count(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── CursorStore ─────────────────────────────────────────────────────────────

/// Per-source high-water marks over append-only raw streams.
pub trait CursorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The highest raw id already folded into dirty-period discovery, or 0.
  fn last_processed_id(
    &self,
    source: Source,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Advance the cursor. A value lower than the stored one is ignored, so
  /// the cursor never moves backwards.
  fn set_last_processed_id(
    &self,
    source: Source,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
