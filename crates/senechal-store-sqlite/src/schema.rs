//! SQL schema for the Senechal canonical store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Durable change log. Rows are re-armed, never deleted.
CREATE TABLE IF NOT EXISTS source_updates (
    source           TEXT    NOT NULL,   -- 'garmin' | 'withings'
    period_type      TEXT    NOT NULL,   -- 'day' | 'week' | 'month' | 'year'
    period_start     TEXT    NOT NULL,   -- YYYY-MM-DD HH:MM:SS, local time
    period_end       TEXT    NOT NULL,   -- exclusive
    raw_data_updated TEXT    NOT NULL,   -- RFC 3339 UTC
    summary_updated  TEXT,               -- RFC 3339 UTC; set by mark_clean
    needs_update     INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (source, period_type, period_start)
);

-- Materialised view: one row per (period, metric), overwritten on recompute.
CREATE TABLE IF NOT EXISTS summaries (
    period_type  TEXT    NOT NULL,
    period_start TEXT    NOT NULL,
    period_end   TEXT    NOT NULL,
    metric_id    TEXT    NOT NULL,
    avg_value    REAL,
    min_value    REAL,
    max_value    REAL,
    sample_count INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT    NOT NULL,
    PRIMARY KEY (period_type, period_start, metric_id)
);

CREATE TABLE IF NOT EXISTS sync_metadata (
    source     TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (source, key)
);

CREATE TABLE IF NOT EXISTS metrics (
    metric_id TEXT PRIMARY KEY,
    group_id  TEXT NOT NULL,
    unit      TEXT NOT NULL
);

CREATE VIEW IF NOT EXISTS v_pending_updates AS
    SELECT * FROM source_updates WHERE needs_update = 1;

CREATE INDEX IF NOT EXISTS source_updates_pending_idx
    ON source_updates(source, needs_update, period_start);

PRAGMA user_version = 1;
";
