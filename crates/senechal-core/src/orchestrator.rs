//! The incremental aggregation loop.
//!
//! A run asks the change tracker for a source's dirty periods, has the
//! source's adapter recompute each one from raw data, writes the result as a
//! single batch and only then marks the period clean. A failing period is
//! logged and left dirty; the loop moves on to the next one.
//!
//! Runs are single-threaded and sequential. Concurrent runs for the same
//! source must be serialised by the caller.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;

use crate::{
  Error, Result,
  period::{Period, affected_periods},
  source::{IncrementalSource, Source, SourceAdapter},
  store::{ChangeTracker, CursorStore, SummaryStore},
};

// ─── Per-period state ────────────────────────────────────────────────────────

/// Where a dirty period is in its processing lifecycle.
///
/// Every period listed dirty starts `Pending` and leaves the run `Committed`
/// or `FailedRetryLater`. A failed period is listed `Pending` again by the
/// next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodState {
  Pending,
  Processing,
  Committed,
  FailedRetryLater,
}

/// What happened to one period during a run.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodOutcome {
  pub period:          Period,
  pub state:           PeriodState,
  pub metrics_written: usize,
  /// `false` when raw data was touched again while the period was processing.
  pub cleared:         bool,
  pub error:           Option<String>,
}

/// Summary of one orchestrator run over a single source.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub source:   Source,
  pub outcomes: Vec<PeriodOutcome>,
  /// Periods still needing an update once the run finished.
  pub pending:  usize,
}

impl RunReport {
  pub fn attempted(&self) -> usize { self.outcomes.len() }

  pub fn committed(&self) -> usize {
    self.count_in(PeriodState::Committed)
  }

  pub fn failed(&self) -> usize { self.count_in(PeriodState::FailedRetryLater) }

  pub fn metrics_written(&self) -> usize {
    self.outcomes.iter().map(|o| o.metrics_written).sum()
  }

  fn count_in(&self, state: PeriodState) -> usize {
    self.outcomes.iter().filter(|o| o.state == state).count()
  }
}

// ─── Run ─────────────────────────────────────────────────────────────────────

/// Recompute every dirty period of the adapter's source.
///
/// Only a failure to reach the canonical store aborts the run; adapter and
/// write failures are confined to their period.
pub async fn run_pending<S, A>(store: &S, adapter: &A) -> Result<RunReport>
where
  S: ChangeTracker + SummaryStore,
  A: SourceAdapter,
{
  let source = adapter.source();

  store
    .register_metrics(adapter.metric_defs())
    .await
    .map_err(Error::store)?;

  let dirty = store.list_dirty(source).await.map_err(Error::store)?;
  tracing::info!("Found {} periods needing updates for {source}", dirty.len());

  let mut outcomes: Vec<PeriodOutcome> = dirty
    .into_iter()
    .map(|row| PeriodOutcome {
      period:          row.period,
      state:           PeriodState::Pending,
      metrics_written: 0,
      cleared:         false,
      error:           None,
    })
    .collect();

  for outcome in &mut outcomes {
    let period = outcome.period;
    outcome.state = PeriodState::Processing;
    tracing::info!("Processing {period} for {source}");

    match process_period(store, adapter, period).await {
      Ok((written, cleared)) => {
        outcome.state = PeriodState::Committed;
        outcome.metrics_written = written;
        outcome.cleared = cleared;
        if cleared {
          tracing::info!("Committed {written} metrics for {period}");
        } else {
          tracing::warn!(
            "Committed {written} metrics for {period}, but raw data changed \
             during processing; left dirty"
          );
        }
      }
      Err(err) => {
        tracing::error!("Failed to process {period} for {source}: {err}");
        outcome.state = PeriodState::FailedRetryLater;
        outcome.error = Some(err.to_string());
      }
    }
  }

  let pending = store.pending_count(source).await.map_err(Error::store)?;
  let report = RunReport { source, outcomes, pending };
  tracing::info!(
    "{source}: {} of {} periods committed, {} failed, {} still pending",
    report.committed(),
    report.attempted(),
    report.failed(),
    report.pending,
  );
  Ok(report)
}

async fn process_period<S, A>(
  store: &S,
  adapter: &A,
  period: Period,
) -> Result<(usize, bool)>
where
  S: ChangeTracker + SummaryStore,
  A: SourceAdapter,
{
  // Captured before reading raw data: anything touched later re-dirties.
  let as_of = Utc::now();

  let metrics = adapter.compute_period(period).await.map_err(Error::adapter)?;
  if metrics.is_empty() {
    tracing::debug!("No samples for {period}; nothing to write");
  }
  for m in &metrics {
    tracing::debug!(
      "{period} {}: avg={:?} min={:?} max={:?} n={}",
      m.metric_id,
      m.avg,
      m.min,
      m.max,
      m.count
    );
  }

  let written = store
    .upsert_period(period, &metrics)
    .await
    .map_err(Error::store)?;
  let cleared = store
    .mark_clean(adapter.source(), period, as_of)
    .await
    .map_err(Error::store)?;

  Ok((written, cleared))
}

// ─── Dirty marking ───────────────────────────────────────────────────────────

/// Mark `periods` dirty for `source`, or only report them when `dry_run`.
pub async fn mark_periods<S>(
  store: &S,
  source: Source,
  periods: &BTreeSet<Period>,
  dry_run: bool,
) -> Result<usize>
where
  S: ChangeTracker,
{
  if dry_run {
    tracing::info!("[DRY RUN] Would mark {} periods for update:", periods.len());
    for period in periods {
      tracing::info!("  {period}");
    }
    return Ok(0);
  }

  let periods: Vec<Period> = periods.iter().copied().collect();
  let marked = store
    .mark_dirty(source, &periods, Utc::now())
    .await
    .map_err(Error::store)?;
  tracing::info!("Marked {marked} periods for update");
  Ok(marked)
}

/// Result of folding an append-only raw stream into the change log.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
  pub since_id:    i64,
  /// The cursor after discovery; equal to `since_id` on dry runs.
  pub cursor:      i64,
  pub new_records: usize,
  pub periods:     BTreeSet<Period>,
}

/// Mark dirty every period touched by raw records newer than the source's
/// cursor, then advance the cursor to the highest id seen.
///
/// A dry run reports the periods and leaves both the change log and the
/// cursor untouched.
pub async fn discover_incremental<S, A>(
  store: &S,
  adapter: &A,
  dry_run: bool,
) -> Result<Discovery>
where
  S: ChangeTracker + CursorStore,
  A: IncrementalSource,
{
  let source = adapter.source();
  let since_id = store.last_processed_id(source).await.map_err(Error::store)?;
  let records = adapter
    .records_since(since_id)
    .await
    .map_err(Error::adapter)?;

  let Some(last_id) = records.iter().map(|r| r.id).max() else {
    tracing::info!("No new {source} records since id {since_id}");
    return Ok(Discovery {
      since_id,
      cursor: since_id,
      new_records: 0,
      periods: BTreeSet::new(),
    });
  };

  let periods = affected_periods(records.iter().map(|r| r.taken_at));
  tracing::info!(
    "Found {} new {source} records (ids {}..={last_id}) touching {} periods",
    records.len(),
    since_id + 1,
    periods.len(),
  );

  mark_periods(store, source, &periods, dry_run).await?;

  let cursor = if dry_run {
    tracing::info!("[DRY RUN] Cursor left at {since_id}");
    since_id
  } else {
    store
      .set_last_processed_id(source, last_id)
      .await
      .map_err(Error::store)?;
    last_id
  };

  Ok(Discovery { since_id, cursor, new_records: records.len(), periods })
}
