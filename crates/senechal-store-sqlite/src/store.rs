//! [`SqliteStore`], the SQLite implementation of the canonical-store traits.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::OptionalExtension as _;
use senechal_core::{
  metric::{MetricDef, MetricSummary, SummaryRecord},
  period::{Period, PeriodKind},
  source::Source,
  store::{ChangeTracker, CursorStore, DirtyPeriod, LAST_UID_KEY, SummaryStore},
};

use crate::{
  Error, Result,
  encode::{RawDirtyPeriod, RawSummary, encode_dt, encode_naive},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The canonical Senechal store backed by a single SQLite file.
///
/// Clones share one reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

// ─── ChangeTracker impl ──────────────────────────────────────────────────────

impl ChangeTracker for SqliteStore {
  type Error = Error;

  async fn mark_dirty(
    &self,
    source: Source,
    periods: &[Period],
    touched_at: DateTime<Utc>,
  ) -> Result<usize> {
    let source_str = source.as_str();
    let touched_str = encode_dt(touched_at);
    let rows: Vec<(&'static str, String, String)> = periods
      .iter()
      .map(|p| (p.kind.as_str(), encode_naive(p.start), encode_naive(p.end)))
      .collect();

    let marked = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          // `raw_data_updated` never moves backwards.
          let mut stmt = tx.prepare(
            "INSERT INTO source_updates (
               source, period_type, period_start, period_end,
               raw_data_updated, needs_update
             ) VALUES (?1, ?2, ?3, ?4, ?5, 1)
             ON CONFLICT (source, period_type, period_start) DO UPDATE SET
               period_end       = excluded.period_end,
               raw_data_updated = MAX(raw_data_updated, excluded.raw_data_updated),
               needs_update     = 1",
          )?;
          for (kind, start, end) in &rows {
            stmt.execute(rusqlite::params![source_str, kind, start, end, touched_str])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    tracing::debug!("Marked {marked} {source} periods dirty");
    Ok(marked)
  }

  async fn list_dirty(&self, source: Source) -> Result<Vec<DirtyPeriod>> {
    let source_str = source.as_str();

    let raws: Vec<RawDirtyPeriod> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM v_pending_updates
           WHERE source = ?1
           ORDER BY period_start ASC, period_end ASC",
          RawDirtyPeriod::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![source_str], RawDirtyPeriod::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDirtyPeriod::into_dirty_period).collect()
  }

  async fn mark_clean(
    &self,
    source: Source,
    period: Period,
    as_of: DateTime<Utc>,
  ) -> Result<bool> {
    let source_str = source.as_str();
    let kind_str = period.kind.as_str();
    let start_str = encode_naive(period.start);
    let as_of_str = encode_dt(as_of);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE source_updates
           SET needs_update    = 0,
               summary_updated = ?5
           WHERE source = ?1
             AND period_type = ?2
             AND period_start = ?3
             AND raw_data_updated <= ?4",
          rusqlite::params![source_str, kind_str, start_str, as_of_str, now_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn get_period(
    &self,
    source: Source,
    kind: PeriodKind,
    start: NaiveDateTime,
  ) -> Result<Option<DirtyPeriod>> {
    let source_str = source.as_str();
    let kind_str = kind.as_str();
    let start_str = encode_naive(start);

    let raw: Option<RawDirtyPeriod> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM source_updates
           WHERE source = ?1 AND period_type = ?2 AND period_start = ?3",
          RawDirtyPeriod::COLUMNS
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![source_str, kind_str, start_str],
              RawDirtyPeriod::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDirtyPeriod::into_dirty_period).transpose()
  }

  async fn pending_count(&self, source: Source) -> Result<usize> {
    let source_str = source.as_str();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM v_pending_updates WHERE source = ?1",
          rusqlite::params![source_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as usize)
  }
}

// ─── SummaryStore impl ───────────────────────────────────────────────────────

impl SummaryStore for SqliteStore {
  type Error = Error;

  async fn register_metrics(&self, defs: &[MetricDef]) -> Result<()> {
    let rows: Vec<(&'static str, &'static str, &'static str)> = defs
      .iter()
      .map(|d| (d.metric_id, d.group.as_str(), d.unit))
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO metrics (metric_id, group_id, unit) VALUES (?1, ?2, ?3)
             ON CONFLICT (metric_id) DO UPDATE SET
               group_id = excluded.group_id,
               unit     = excluded.unit",
          )?;
          for (id, group, unit) in &rows {
            stmt.execute(rusqlite::params![id, group, unit])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_period(
    &self,
    period: Period,
    metrics: &[MetricSummary],
  ) -> Result<usize> {
    let kind_str = period.kind.as_str();
    let start_str = encode_naive(period.start);
    let end_str = encode_naive(period.end);
    let now_str = encode_dt(Utc::now());
    let metrics = metrics.to_vec();

    let written = self
      .conn
      .call(move |conn| {
        // Dropping the transaction on an early return rolls back every write
        // made for this period.
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO summaries (
               period_type, period_start, period_end, metric_id,
               avg_value, min_value, max_value, sample_count, last_updated
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (period_type, period_start, metric_id) DO UPDATE SET
               period_end   = excluded.period_end,
               avg_value    = excluded.avg_value,
               min_value    = excluded.min_value,
               max_value    = excluded.max_value,
               sample_count = excluded.sample_count,
               last_updated = excluded.last_updated",
          )?;
          for m in &metrics {
            stmt.execute(rusqlite::params![
              kind_str,
              start_str,
              end_str,
              m.metric_id,
              m.avg,
              m.min,
              m.max,
              m.count,
              now_str,
            ])?;
          }
        }
        tx.commit()?;
        Ok(metrics.len())
      })
      .await?;

    Ok(written)
  }

  async fn get_summaries(
    &self,
    kind: PeriodKind,
    start: NaiveDateTime,
  ) -> Result<Vec<SummaryRecord>> {
    let kind_str = kind.as_str();
    let start_str = encode_naive(start);

    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT period_type, period_start, period_end, metric_id,
                  avg_value, min_value, max_value, sample_count, last_updated
           FROM summaries
           WHERE period_type = ?1 AND period_start = ?2
           ORDER BY metric_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str, start_str], RawSummary::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_record).collect()
  }

  async fn summary_count(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM summaries", [], |r| r.get(0))?))
      .await?;
    Ok(count as usize)
  }
}

// ─── CursorStore impl ────────────────────────────────────────────────────────

impl CursorStore for SqliteStore {
  type Error = Error;

  async fn last_processed_id(&self, source: Source) -> Result<i64> {
    let source_str = source.as_str();

    let value: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM sync_metadata WHERE source = ?1 AND key = ?2",
              rusqlite::params![source_str, LAST_UID_KEY],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    match value {
      None => Ok(0),
      Some(v) => v.trim().parse().map_err(|_| Error::Cursor {
        source_name: source_str.to_owned(),
        value:       v,
      }),
    }
  }

  async fn set_last_processed_id(&self, source: Source, id: i64) -> Result<()> {
    let source_str = source.as_str();
    let now_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sync_metadata (source, key, value, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (source, key) DO UPDATE SET
             value = CASE
               WHEN CAST(excluded.value AS INTEGER) > CAST(sync_metadata.value AS INTEGER)
               THEN excluded.value
               ELSE sync_metadata.value
             END,
             updated_at = excluded.updated_at",
          rusqlite::params![source_str, LAST_UID_KEY, id.to_string(), now_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}
