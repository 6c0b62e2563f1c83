//! End-to-end runs against on-disk raw stores and a file-backed canonical
//! store.

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveDateTime, Utc};
use senechal_core::{
  period::{Period, PeriodKind},
  source::Source,
  store::{ChangeTracker, CursorStore, SummaryStore},
};
use senechal_sources::{Adapter, GarminAdapter, GarminPaths, WithingsAdapter, WithingsPaths};
use senechal_store_sqlite::SqliteStore;
use tempfile::TempDir;

use crate::{
  EtlConfig,
  plan::{Scope, parse_since},
  run::{run_all_pending, run_source},
  status,
};

fn seed(path: &Path, sql: &str) {
  let conn = rusqlite::Connection::open(path).unwrap();
  conn.execute_batch(sql).unwrap();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime { date(y, m, d).and_hms_opt(0, 0, 0).unwrap() }

fn day(y: i32, m: u32, d: u32) -> Period { Period::containing(midnight(y, m, d), PeriodKind::Day) }

/// A temp directory holding the canonical store and every raw store.
struct Env {
  dir:      TempDir,
  store:    SqliteStore,
  withings: PathBuf,
  garmin:   GarminPaths,
}

impl Env {
  async fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("senechal.db")).await.unwrap();

    let withings = dir.path().join("withings.db");
    seed(
      &withings,
      "CREATE TABLE measurements (id INTEGER PRIMARY KEY, date DATETIME, type INTEGER, value REAL);",
    );

    let garmin = GarminPaths {
      garmin_db:     dir.path().join("garmin.db"),
      monitoring_db: dir.path().join("garmin_monitoring.db"),
      summary_db:    dir.path().join("garmin_summary.db"),
    };
    seed(
      &garmin.garmin_db,
      "CREATE TABLE resting_hr (day DATE, resting_heart_rate INTEGER);
       CREATE TABLE sleep (day DATE, total_sleep TIME, deep_sleep TIME,
                           rem_sleep TIME, light_sleep TIME, score INTEGER);",
    );
    seed(
      &garmin.monitoring_db,
      "CREATE TABLE monitoring_hr (timestamp DATETIME, heart_rate INTEGER);
       CREATE TABLE monitoring_pulse_ox (timestamp DATETIME, pulse_ox REAL);
       CREATE TABLE monitoring_rr (timestamp DATETIME, rr REAL);
       CREATE TABLE monitoring_intensity (timestamp DATETIME,
         moderate_activity_time TIME, vigorous_activity_time TIME);",
    );
    seed(
      &garmin.summary_db,
      "CREATE TABLE days_summary (day DATE PRIMARY KEY, hr_avg INTEGER, steps_goal INTEGER);",
    );

    Self { dir, store, withings, garmin }
  }

  fn withings(&self) -> Adapter {
    Adapter::Withings(WithingsAdapter::new(WithingsPaths { db: self.withings.clone() }))
  }

  fn garmin(&self) -> Adapter { Adapter::Garmin(GarminAdapter::new(self.garmin.clone())) }

  fn withings_only_config(&self) -> EtlConfig {
    EtlConfig {
      senechal_db_path: Some(self.dir.path().join("senechal.db")),
      withings_db_path: Some(self.withings.clone()),
      ..Default::default()
    }
  }
}

#[tokio::test]
async fn dry_run_lists_exactly_what_the_real_run_writes() {
  let env = Env::new().await;
  seed(
    &env.withings,
    "INSERT INTO measurements (id, date, type, value) VALUES (1, '2024-03-02 07:00:00', 1, 80.0);",
  );
  let scope = Scope::Since(parse_since("01/03/2024").unwrap());
  let today = date(2024, 3, 3);
  let adapter = env.withings();

  let preview = run_source(&env.store, &adapter, scope, true, today).await.unwrap();

  // 1-3 March; the Monday 26 Feb week; March; 2024.
  assert_eq!(preview.periods.len(), 6);
  assert!(preview.report.is_none());
  assert_eq!(env.store.pending_count(Source::Withings).await.unwrap(), 0);
  assert_eq!(env.store.summary_count().await.unwrap(), 0);

  let real = run_source(&env.store, &adapter, scope, false, today).await.unwrap();

  assert_eq!(real.periods, preview.periods);
  let report = real.report.unwrap();
  let processed: BTreeSet<Period> = report.outcomes.iter().map(|o| o.period).collect();
  assert_eq!(processed, preview.periods);
  assert_eq!(report.committed(), 6);
  assert_eq!(report.pending, 0);
  // Weight lands on 2 March and every period containing it.
  assert_eq!(env.store.summary_count().await.unwrap(), 4);
  assert!(env.store.get_summaries(PeriodKind::Day, midnight(2024, 3, 1)).await.unwrap().is_empty());
  // Date-scoped runs leave the cursor alone.
  assert_eq!(env.store.last_processed_id(Source::Withings).await.unwrap(), 0);
}

#[tokio::test]
async fn rerun_without_new_data_is_a_noop() {
  let env = Env::new().await;
  seed(
    &env.withings,
    "INSERT INTO measurements (id, date, type, value) VALUES
       (1, '2024-03-15 07:00:00', 1, 80.0),
       (2, '2024-03-15 07:01:00', 6, 21.5);",
  );
  let adapter = env.withings();
  let today = date(2024, 3, 20);

  let first = run_source(&env.store, &adapter, Scope::Discover, false, today).await.unwrap();
  assert_eq!(first.cursor, Some(2));
  assert_eq!(first.report.as_ref().unwrap().committed(), 4);
  let before = env.store.get_summaries(PeriodKind::Day, midnight(2024, 3, 15)).await.unwrap();
  assert_eq!(before.len(), 2);

  let second = run_source(&env.store, &adapter, Scope::Discover, false, today).await.unwrap();

  assert_eq!(second.cursor, Some(2));
  assert!(second.periods.is_empty());
  let report = second.report.unwrap();
  assert_eq!(report.attempted(), 0);
  assert_eq!(report.metrics_written(), 0);
  let after = env.store.get_summaries(PeriodKind::Day, midnight(2024, 3, 15)).await.unwrap();
  assert_eq!(after, before);
}

#[tokio::test]
async fn new_records_past_cursor_mark_only_their_periods() {
  let env = Env::new().await;
  seed(
    &env.withings,
    "INSERT INTO measurements (id, date, type, value) VALUES (1, '2024-03-15 07:00:00', 1, 80.0);",
  );
  let adapter = env.withings();
  let today = date(2024, 3, 20);
  run_source(&env.store, &adapter, Scope::Discover, false, today).await.unwrap();

  seed(
    &env.withings,
    "INSERT INTO measurements (id, date, type, value) VALUES (2, '2024-03-18 07:00:00', 1, 79.0);",
  );
  let run = run_source(&env.store, &adapter, Scope::Discover, false, today).await.unwrap();

  assert_eq!(run.cursor, Some(2));
  // New day and new week; March and 2024 are recomputed with both samples.
  assert_eq!(run.periods.len(), 4);
  assert_eq!(run.report.unwrap().committed(), 4);
  let month = env.store.get_summaries(PeriodKind::Month, midnight(2024, 3, 1)).await.unwrap();
  assert_eq!(month[0].sample_count, 2);
  assert_eq!(month[0].avg, Some(79.5));
}

#[tokio::test]
async fn withings_dry_run_keeps_cursor() {
  let env = Env::new().await;
  seed(
    &env.withings,
    "INSERT INTO measurements (id, date, type, value) VALUES (7, '2024-03-15 07:00:00', 1, 80.0);",
  );

  let preview = run_source(&env.store, &env.withings(), Scope::Discover, true, date(2024, 3, 20))
    .await
    .unwrap();

  assert_eq!(preview.cursor, Some(0));
  assert_eq!(preview.periods.len(), 4);
  assert_eq!(env.store.last_processed_id(Source::Withings).await.unwrap(), 0);
  assert_eq!(env.store.pending_count(Source::Withings).await.unwrap(), 0);
}

#[tokio::test]
async fn dry_run_counts_existing_backlog() {
  let env = Env::new().await;
  let year = Period::containing(midnight(2024, 3, 2), PeriodKind::Year);
  env
    .store
    .mark_dirty(Source::Withings, &[day(2024, 1, 10), year], Utc::now())
    .await
    .unwrap();
  let scope = Scope::ForceDate(date(2024, 3, 2));
  let adapter = env.withings();

  let preview = run_source(&env.store, &adapter, scope, true, date(2024, 3, 20)).await.unwrap();

  // Day, week, month and year of 2 March, plus 10 January from the backlog.
  assert_eq!(preview.periods.len(), 4);
  assert_eq!(preview.to_process.len(), 5);
  assert!(preview.to_process.contains(&day(2024, 1, 10)));

  let real = run_source(&env.store, &adapter, scope, false, date(2024, 3, 20)).await.unwrap();
  let processed: BTreeSet<Period> = real.report.unwrap().outcomes.iter().map(|o| o.period).collect();
  assert_eq!(processed, preview.to_process);
}

#[tokio::test]
async fn garmin_discovery_materialises_vendor_rows() {
  let env = Env::new().await;
  seed(
    &env.garmin.summary_db,
    "INSERT INTO days_summary (day, hr_avg, steps_goal) VALUES ('2024-03-15', 62, 10000);",
  );

  let run = run_source(&env.store, &env.garmin(), Scope::Discover, false, date(2024, 3, 20))
    .await
    .unwrap();

  assert_eq!(run.periods, BTreeSet::from([day(2024, 3, 15)]));
  let rows = env.store.get_summaries(PeriodKind::Day, midnight(2024, 3, 15)).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].metric_id, "hr");
  assert_eq!(rows[0].avg, Some(62.0));
  assert_eq!(rows[0].sample_count, 1);
}

#[tokio::test]
async fn failing_periods_stay_pending_and_others_commit() {
  let env = Env::new().await;
  seed(
    &env.garmin.garmin_db,
    "INSERT INTO sleep (day, total_sleep) VALUES ('2024-03-14', '07:00:00'), ('2024-03-15', 'bad:xx');",
  );

  let run = run_source(
    &env.store,
    &env.garmin(),
    Scope::Since(date(2024, 3, 14)),
    false,
    date(2024, 3, 15),
  )
  .await
  .unwrap();

  // Only 14 March avoids the malformed row.
  let report = run.report.unwrap();
  assert_eq!(report.committed(), 1);
  assert_eq!(report.failed(), 4);
  assert_eq!(report.pending, 4);
  let rows = env.store.get_summaries(PeriodKind::Day, midnight(2024, 3, 14)).await.unwrap();
  assert_eq!(rows[0].metric_id, "sleep_total");
  assert_eq!(rows[0].avg, Some(420.0));
}

#[tokio::test]
async fn pending_skips_unconfigured_source() {
  let env = Env::new().await;
  seed(
    &env.withings,
    "INSERT INTO measurements (id, date, type, value) VALUES (1, '2024-03-15 07:00:00', 10, 118.0);",
  );
  env.store.mark_dirty(Source::Garmin, &[day(2024, 3, 15)], Utc::now()).await.unwrap();
  env.store.mark_dirty(Source::Withings, &[day(2024, 3, 15)], Utc::now()).await.unwrap();

  let config = env.withings_only_config();
  let reports = run_all_pending(&env.store, &config, &[Source::Garmin, Source::Withings]).await;

  assert_eq!(reports.len(), 1);
  assert_eq!(reports[0].source, Source::Withings);
  assert_eq!(reports[0].committed(), 1);
  assert_eq!(env.store.pending_count(Source::Garmin).await.unwrap(), 1);

  let status = status::collect(&env.store).await.unwrap();
  assert_eq!(status.summaries, 1);
  let garmin = status.sources.iter().find(|s| s.source == Source::Garmin).unwrap();
  assert_eq!(garmin.pending, 1);
}
