//! Per-command drivers: mark the scope's periods, then process everything
//! pending for the source.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use senechal_core::{
  orchestrator::{RunReport, discover_incremental, mark_periods, run_pending},
  period::Period,
  source::{Source, SourceAdapter},
  store::ChangeTracker as _,
};
use senechal_sources::Adapter;
use senechal_store_sqlite::SqliteStore;

use crate::{EtlConfig, Result, plan::Scope};

/// What one `garmin` or `withings` invocation did.
#[derive(Debug, Clone)]
pub struct SourceRun {
  pub source:     Source,
  pub dry_run:    bool,
  /// Periods marked dirty, or that would have been on a dry run.
  pub periods:    BTreeSet<Period>,
  /// Everything the processing step covers: the marked periods together
  /// with the backlog already dirty before this run.
  pub to_process: BTreeSet<Period>,
  /// The incremental cursor after discovery, for cursor-based sources.
  pub cursor:     Option<i64>,
  /// `None` on a dry run.
  pub report:     Option<RunReport>,
}

/// Mark the periods selected by `scope` dirty and process the source's
/// pending periods.
///
/// A dry run only reports: the change log, the summaries and the cursor
/// are left as they were.
pub async fn run_source(
  store: &SqliteStore,
  adapter: &Adapter,
  scope: Scope,
  dry_run: bool,
  today: NaiveDate,
) -> Result<SourceRun> {
  let source = adapter.source();
  if dry_run {
    tracing::info!("Running in DRY RUN mode - no changes will be made");
  }

  let (periods, cursor) = match (scope.periods(today)?, adapter) {
    (Some(periods), _) => {
      if let Some((first, last)) = scope.days(today)? {
        tracing::info!("Processing {source} data from {first} through {last}");
      }
      tracing::info!("Identified {} periods to process", periods.len());
      mark_periods(store, source, &periods, dry_run).await?;
      (periods, None)
    }
    (None, Adapter::Garmin(garmin)) => {
      tracing::info!("Processing all available Garmin summary data");
      let periods = garmin.summary_periods().await?;
      mark_periods(store, source, &periods, dry_run).await?;
      (periods, None)
    }
    (None, Adapter::Withings(withings)) => {
      let found = discover_incremental(store, withings, dry_run).await?;
      if found.cursor != found.since_id {
        tracing::info!("Withings cursor moved from {} to {}", found.since_id, found.cursor);
      }
      (found.periods, Some(found.cursor))
    }
  };

  let backlog = store.list_dirty(source).await?;
  let mut to_process = periods.clone();
  to_process.extend(backlog.into_iter().map(|row| row.period));

  let report = if dry_run {
    tracing::info!(
      "[DRY RUN] Would process {} periods ({} newly marked, plus pending backlog)",
      to_process.len(),
      periods.len(),
    );
    None
  } else {
    let report = run_pending(store, adapter).await?;
    tracing::info!("Completed processing {source} data");
    Some(report)
  };

  Ok(SourceRun { source, dry_run, periods, to_process, cursor, report })
}

/// Process already-dirty periods for each of `sources`, without discovery.
///
/// A source whose raw stores are not configured, or whose run cannot reach
/// the canonical store, is logged and skipped.
pub async fn run_all_pending(
  store: &SqliteStore,
  config: &EtlConfig,
  sources: &[Source],
) -> Vec<RunReport> {
  let mut reports = Vec::with_capacity(sources.len());
  for &source in sources {
    let adapter = match config.adapter(source) {
      Ok(adapter) => adapter,
      Err(err) => {
        tracing::error!("Error processing {source}: {err}");
        continue;
      }
    };
    match run_pending(store, &adapter).await {
      Ok(report) => reports.push(report),
      Err(err) => tracing::error!("Error processing {source}: {err}"),
    }
  }
  reports
}
